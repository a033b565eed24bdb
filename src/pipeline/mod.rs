//! Pipeline stages for reference generation.
//!
//! Each submodule wraps exactly one external program or one file write, so
//! every stage can be tested on its own and driven directly by library
//! users.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ metadata          (always)
//!   │
//!   └─▶ office / preview ──▶ rasterize      (execute mode only)
//!       (deck → PDF)         (PDF → slide-N.png)
//! ```
//!
//! 1. [`input`]     — validate the user-supplied path and classify it
//! 2. [`metadata`]  — write the JSON stub next to the input
//! 3. [`office`]    — LibreOffice headless PDF export
//! 4. [`preview`]   — macOS Preview automation, an alternative to [`office`]
//! 5. [`rasterize`] — ImageMagick PDF → PNG
//!
//! [`process`] holds the shared subprocess plumbing.

pub mod input;
pub mod metadata;
pub mod office;
pub mod preview;
pub mod process;
pub mod rasterize;
