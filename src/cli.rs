use clap::{Parser, ValueEnum};

pub const DEFAULT_RULE_FILE: &str = "rules/final_business_logic_rules.json";

#[derive(Parser, Debug)]
#[command(
    name = "blvgate",
    version,
    about = "Business-logic violation gate for CI"
)]
pub struct Cli {
    /// Base URL of the target service under test, e.g. http://localhost:5000
    pub target: String,
    #[arg(long, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        default_value = DEFAULT_RULE_FILE,
        help = "Rule file (JSON document with a `rules` array)"
    )]
    pub rules: String,
    #[arg(
        long,
        value_enum,
        default_value_t = Profile::Demo,
        help = "Target profile selecting login flow and precondition endpoints"
    )]
    pub profile: Profile,
    #[arg(long, default_value_t = 8, help = "Per-request timeout in seconds")]
    pub timeout_secs: u64,
    #[arg(
        long,
        help = "Abort remaining rules once this wall-clock budget is spent"
    )]
    pub deadline_secs: Option<u64>,
    #[arg(long, help = "Result upload endpoint (overrides CI_RESULT_API)")]
    pub report_url: Option<String>,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum Profile {
    Demo,
    Shop,
}
