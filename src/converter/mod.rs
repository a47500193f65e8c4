//! Image format conversion
//!
//! Pages are stored mostly as JPEG 2000; callers may ask for JPEG instead.
//! Conversion is delegated to an external tool behind the [`Converter`] trait:
//!
//! - [`CommandConverter`]: runs a converter binary (ImageMagick by default)
//! - [`NoOpConverter`]: used when no binary is available; fails every conversion
//!
//! A missing converter is only an error once a conversion is actually needed.
//!
//! ## Usage
//!
//! ```no_run
//! use pagepack::converter::{CommandConverter, Converter};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = CommandConverter::from_path().ok_or("no converter in PATH")?;
//!     converter
//!         .convert(Path::new("0001.jp2"), Path::new("0001.jpg"))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod cli;
mod noop;
mod traits;

pub use cli::CommandConverter;
pub use noop::NoOpConverter;
pub use traits::Converter;
