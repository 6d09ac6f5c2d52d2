//! Repository rules. A rule's `parameters` object is shaped by its `type`;
//! decoding looks the type up in [`decode_rule`] and picks the matching shape.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRuleParameters {
    pub update_allows_fetch_and_merge: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDeploymentsRuleParameters {
    pub required_deployment_environments: Vec<String>,
}

/// How a pattern rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternOperator {
    StartsWith,
    EndsWith,
    Contains,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRuleParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negate: Option<bool>,
    pub operator: PatternOperator,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRuleParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_merge_methods: Option<Vec<String>>,
    pub dismiss_stale_reviews_on_push: bool,
    pub require_code_owner_review: bool,
    pub require_last_push_approval: bool,
    pub required_approving_review_count: u32,
    pub required_review_thread_resolution: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRequiredStatusCheck {
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredStatusChecksRuleParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_not_enforce_on_create: Option<bool>,
    pub required_status_checks: Vec<RuleRequiredStatusCheck>,
    pub strict_required_status_checks_policy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeQueueRuleParameters {
    pub check_response_timeout_minutes: u32,
    /// `ALLGREEN` or `HEADGREEN`.
    pub grouping_strategy: String,
    pub max_entries_to_build: u32,
    pub max_entries_to_merge: u32,
    /// `MERGE`, `SQUASH` or `REBASE`.
    pub merge_method: String,
    pub min_entries_to_merge: u32,
    pub min_entries_to_merge_wait_minutes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleWorkflow {
    pub path: String,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowsRuleParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_not_enforce_on_create: Option<bool>,
    pub workflows: Vec<RuleWorkflow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePathRestrictionRuleParameters {
    pub restricted_file_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxFilePathLengthRuleParameters {
    pub max_file_path_length: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExtensionRestrictionRuleParameters {
    pub restricted_file_extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxFileSizeRuleParameters {
    /// Megabytes.
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeScanningTool {
    /// `none`, `errors`, `errors_and_warnings` or `all`.
    pub alerts_threshold: String,
    /// `none`, `critical`, `high_or_higher`, `medium_or_higher` or `all`.
    pub security_alerts_threshold: String,
    pub tool: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeScanningRuleParameters {
    pub code_scanning_tools: Vec<CodeScanningTool>,
}

/// A rule and its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Creation,
    Update(Option<UpdateRuleParameters>),
    Deletion,
    RequiredLinearHistory,
    MergeQueue(MergeQueueRuleParameters),
    RequiredDeployments(RequiredDeploymentsRuleParameters),
    RequiredSignatures,
    PullRequest(PullRequestRuleParameters),
    RequiredStatusChecks(RequiredStatusChecksRuleParameters),
    NonFastForward,
    CommitMessagePattern(PatternRuleParameters),
    CommitAuthorEmailPattern(PatternRuleParameters),
    CommitterEmailPattern(PatternRuleParameters),
    BranchNamePattern(PatternRuleParameters),
    TagNamePattern(PatternRuleParameters),
    FilePathRestriction(FilePathRestrictionRuleParameters),
    MaxFilePathLength(MaxFilePathLengthRuleParameters),
    FileExtensionRestriction(FileExtensionRestrictionRuleParameters),
    MaxFileSize(MaxFileSizeRuleParameters),
    Workflows(WorkflowsRuleParameters),
    CodeScanning(CodeScanningRuleParameters),
}

impl Rule {
    /// The wire value of `type`.
    pub fn rule_type(&self) -> &'static str {
        match self {
            Rule::Creation => "creation",
            Rule::Update(_) => "update",
            Rule::Deletion => "deletion",
            Rule::RequiredLinearHistory => "required_linear_history",
            Rule::MergeQueue(_) => "merge_queue",
            Rule::RequiredDeployments(_) => "required_deployments",
            Rule::RequiredSignatures => "required_signatures",
            Rule::PullRequest(_) => "pull_request",
            Rule::RequiredStatusChecks(_) => "required_status_checks",
            Rule::NonFastForward => "non_fast_forward",
            Rule::CommitMessagePattern(_) => "commit_message_pattern",
            Rule::CommitAuthorEmailPattern(_) => "commit_author_email_pattern",
            Rule::CommitterEmailPattern(_) => "committer_email_pattern",
            Rule::BranchNamePattern(_) => "branch_name_pattern",
            Rule::TagNamePattern(_) => "tag_name_pattern",
            Rule::FilePathRestriction(_) => "file_path_restriction",
            Rule::MaxFilePathLength(_) => "max_file_path_length",
            Rule::FileExtensionRestriction(_) => "file_extension_restriction",
            Rule::MaxFileSize(_) => "max_file_size",
            Rule::Workflows(_) => "workflows",
            Rule::CodeScanning(_) => "code_scanning",
        }
    }

    /// Build a rule from a `type` string and raw `parameters`, as held in
    /// config files or CLI input.
    pub fn from_parts(rule_type: &str, parameters: Option<Value>) -> crate::error::Result<Rule> {
        Ok(decode_rule(rule_type, parameters)?)
    }

    /// Parameters as JSON, `None` for parameterless rules.
    pub fn parameters(&self) -> Result<Option<Value>, serde_json::Error> {
        let value = match self {
            Rule::Creation
            | Rule::Deletion
            | Rule::RequiredLinearHistory
            | Rule::RequiredSignatures
            | Rule::NonFastForward
            | Rule::Update(None) => return Ok(None),
            Rule::Update(Some(p)) => serde_json::to_value(p)?,
            Rule::MergeQueue(p) => serde_json::to_value(p)?,
            Rule::RequiredDeployments(p) => serde_json::to_value(p)?,
            Rule::PullRequest(p) => serde_json::to_value(p)?,
            Rule::RequiredStatusChecks(p) => serde_json::to_value(p)?,
            Rule::CommitMessagePattern(p)
            | Rule::CommitAuthorEmailPattern(p)
            | Rule::CommitterEmailPattern(p)
            | Rule::BranchNamePattern(p)
            | Rule::TagNamePattern(p) => serde_json::to_value(p)?,
            Rule::FilePathRestriction(p) => serde_json::to_value(p)?,
            Rule::MaxFilePathLength(p) => serde_json::to_value(p)?,
            Rule::FileExtensionRestriction(p) => serde_json::to_value(p)?,
            Rule::MaxFileSize(p) => serde_json::to_value(p)?,
            Rule::Workflows(p) => serde_json::to_value(p)?,
            Rule::CodeScanning(p) => serde_json::to_value(p)?,
        };
        Ok(Some(value))
    }
}

/// Why a rule could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleDecodeError {
    #[error("rule type {0:?} is not supported")]
    UnknownType(String),
    #[error("rule type {0:?} requires parameters")]
    MissingParameters(&'static str),
    #[error("invalid parameters for rule type {rule_type:?}: {message}")]
    InvalidParameters {
        rule_type: &'static str,
        message: String,
    },
}

impl From<RuleDecodeError> for crate::error::Error {
    fn from(e: RuleDecodeError) -> Self {
        crate::error::Error::Rule(e.to_string())
    }
}

fn params<T: de::DeserializeOwned>(
    rule_type: &'static str,
    raw: Option<Value>,
) -> Result<T, RuleDecodeError> {
    let raw = raw
        .filter(|v| !v.is_null())
        .ok_or(RuleDecodeError::MissingParameters(rule_type))?;
    serde_json::from_value(raw).map_err(|e| RuleDecodeError::InvalidParameters {
        rule_type,
        message: e.to_string(),
    })
}

/// Decode `parameters` according to `type`.
pub fn decode_rule(rule_type: &str, raw: Option<Value>) -> Result<Rule, RuleDecodeError> {
    let rule = match rule_type {
        "creation" => Rule::Creation,
        "deletion" => Rule::Deletion,
        "required_linear_history" => Rule::RequiredLinearHistory,
        "required_signatures" => Rule::RequiredSignatures,
        "non_fast_forward" => Rule::NonFastForward,
        "update" => match raw.filter(|v| !v.is_null()) {
            None => Rule::Update(None),
            some => Rule::Update(Some(params("update", some)?)),
        },
        "merge_queue" => Rule::MergeQueue(params("merge_queue", raw)?),
        "required_deployments" => Rule::RequiredDeployments(params("required_deployments", raw)?),
        "pull_request" => Rule::PullRequest(params("pull_request", raw)?),
        "required_status_checks" => {
            Rule::RequiredStatusChecks(params("required_status_checks", raw)?)
        }
        "commit_message_pattern" => {
            Rule::CommitMessagePattern(params("commit_message_pattern", raw)?)
        }
        "commit_author_email_pattern" => {
            Rule::CommitAuthorEmailPattern(params("commit_author_email_pattern", raw)?)
        }
        "committer_email_pattern" => {
            Rule::CommitterEmailPattern(params("committer_email_pattern", raw)?)
        }
        "branch_name_pattern" => Rule::BranchNamePattern(params("branch_name_pattern", raw)?),
        "tag_name_pattern" => Rule::TagNamePattern(params("tag_name_pattern", raw)?),
        "file_path_restriction" => {
            Rule::FilePathRestriction(params("file_path_restriction", raw)?)
        }
        "max_file_path_length" => Rule::MaxFilePathLength(params("max_file_path_length", raw)?),
        "file_extension_restriction" => {
            Rule::FileExtensionRestriction(params("file_extension_restriction", raw)?)
        }
        "max_file_size" => Rule::MaxFileSize(params("max_file_size", raw)?),
        "workflows" => Rule::Workflows(params("workflows", raw)?),
        "code_scanning" => Rule::CodeScanning(params("code_scanning", raw)?),
        other => return Err(RuleDecodeError::UnknownType(other.to_string())),
    };
    Ok(rule)
}

/// A rule as listed in a ruleset or returned for a branch. The `ruleset_*`
/// fields are only filled in by the rules-for-branch endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRule {
    pub rule: Rule,
    pub ruleset_source_type: Option<String>,
    pub ruleset_source: Option<String>,
    pub ruleset_id: Option<i64>,
}

impl From<Rule> for RepositoryRule {
    fn from(rule: Rule) -> Self {
        Self {
            rule,
            ruleset_source_type: None,
            ruleset_source: None,
            ruleset_id: None,
        }
    }
}

#[derive(Deserialize)]
struct RawRule {
    #[serde(rename = "type")]
    rule_type: String,
    #[serde(default)]
    parameters: Option<Value>,
    #[serde(default)]
    ruleset_source_type: Option<String>,
    #[serde(default)]
    ruleset_source: Option<String>,
    #[serde(default)]
    ruleset_id: Option<i64>,
}

impl<'de> Deserialize<'de> for RepositoryRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRule::deserialize(deserializer)?;
        let rule = decode_rule(&raw.rule_type, raw.parameters).map_err(de::Error::custom)?;
        Ok(RepositoryRule {
            rule,
            ruleset_source_type: raw.ruleset_source_type,
            ruleset_source: raw.ruleset_source,
            ruleset_id: raw.ruleset_id,
        })
    }
}

impl Serialize for RepositoryRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as _;

        let parameters = self.rule.parameters().map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.rule.rule_type())?;
        if let Some(p) = &parameters {
            map.serialize_entry("parameters", p)?;
        }
        if let Some(v) = &self.ruleset_source_type {
            map.serialize_entry("ruleset_source_type", v)?;
        }
        if let Some(v) = &self.ruleset_source {
            map.serialize_entry("ruleset_source", v)?;
        }
        if let Some(v) = &self.ruleset_id {
            map.serialize_entry("ruleset_id", v)?;
        }
        map.end()
    }
}
