pub mod load_stats;
pub mod regex_fixer;

pub use load_stats::LoadStats;
pub use regex_fixer::RegexFixer;
