// Browser module: session trait, its Chrome implementation and the lazy-load scroll loop.

pub mod chrome;
pub mod scroll;
pub mod traits;

pub use chrome::ChromeSession;
pub use scroll::scroll_until_settled;
pub use traits::Browser;
