//! Motion Parameters
//!
//! Runtime configuration for both motion drivers, loaded from JSON.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     JSON document (optional)           │
//! └──────────────┬─────────────────────────┘
//!                │ serde (missing fields → defaults)
//!                ▼
//! ┌────────────────────────────────────────┐
//! │        MotionParams::validated()       │
//! │  - Range clamping per field            │
//! │  - Non-finite values → defaults        │
//! └──────────────┬─────────────────────────┘
//!                │
//!                ▼
//! ┌────────────────────────────────────────┐
//! │  Autonomous driver / Manual driver     │
//! └────────────────────────────────────────┘
//! ```

pub mod motion;

pub use motion::MotionParams;
