//! Client SDK for the ImageFX and MusicFX generation backends
//!
//! Authenticates with a caller-supplied session cookie, builds generation
//! payloads, and wraps each call in session refresh, a hard deadline, bounded
//! retries and best-effort usage reporting. Every failure comes back as one
//! variant of [`Error`].
//!
//! ```no_run
//! use labsfx::fx::{ImageFxClient, ImagePrompt};
//! use labsfx::models::AspectRatio;
//!
//! # async fn run() -> labsfx::Result<()> {
//! let client = ImageFxClient::new("__Secure-next-auth.session-token=...")?;
//! let prompt = ImagePrompt::new("a red fox")?
//!     .with_count(2)
//!     .with_aspect_ratio(AspectRatio::Square);
//!
//! let result = client.generate(prompt, 1).await?;
//! for artifact in result {
//!     let bytes = artifact.decode()?;
//!     println!("{} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod error;
pub mod fx;
pub mod mime;
pub mod models;
pub mod session;

pub use error::{Error, Result};
