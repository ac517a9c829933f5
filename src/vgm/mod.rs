pub mod commands;
pub mod delay;
pub mod header;
pub mod reader;
pub mod writer;

pub use commands::{Command, WriteRegister};
pub use header::VgmHeader;
pub use reader::{VgmFile, VgmReader};
pub use writer::VgmWriter;
