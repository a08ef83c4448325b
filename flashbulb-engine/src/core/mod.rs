mod detection;
mod enums;
mod pattern;
mod signal;
mod signature;
mod version;

// 导出常用项
pub use detection::{CategoryRef, Detection, Resolution};
pub use enums::{MatchType, SignalKind};
pub use pattern::{KeyedPatterns, Matcher, Pattern};
pub use signal::SignalBundle;
pub use signature::{Category, Relation, SignaturePatterns, TechnologySignature};
pub use version::VersionRule;
