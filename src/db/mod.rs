pub mod reference;
pub mod results;
pub mod standings;
pub mod users;

pub use reference::*;
pub use results::*;
pub use standings::*;
pub use users::*;
