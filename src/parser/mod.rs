pub mod bits;
pub mod decoder;
pub mod event;
pub mod frame;
pub mod header;
pub mod helpers;
pub mod main;
pub mod mapper;
pub mod stream;
pub mod tagged;

pub use decoder::*;
pub use event::*;
pub use frame::*;
pub use header::*;
pub use main::*;
pub use mapper::*;
pub use stream::*;
