pub mod cases;
pub mod header;
pub mod history;
pub mod run;
pub mod util;

pub use cases::*;
pub use header::*;
pub use history::*;
pub use run::*;
pub use util::*;
