//! Shell command policy
//!
//! This module decides whether a shell command may run:
//! - **shell_guard**: refuses anything a shell would interpret (chaining,
//!   redirection, substitution) and any token outside a safe character set
//! - **classifier**: sorts the command into a [`RiskTier`]
//! - **approvals**: remembers gray-tier confirmations for a limited time
//!
//! ## Tiers
//!
//! - `Green`: read-only inspection, always runs
//! - `White`: allowed by a structural rule (or unknown command)
//! - `Gray`: needs `approval=once`, `approval=remember_7d`, or a cached grant
//! - `Black`: never runs
//!
//! ## Example
//!
//! ```rust
//! use loongclaw::permissions::{classify, RiskTier};
//!
//! assert_eq!(classify("git status"), RiskTier::White);
//! assert_eq!(classify("npm install left-pad"), RiskTier::Gray);
//! assert_eq!(classify("rm -rf build"), RiskTier::Black);
//! ```

pub mod approvals;
pub mod classifier;
pub mod shell_guard;

pub use approvals::{
    approval_signature, ApprovalCache, ApprovalMap, ApprovalMode, ApprovalRecord, ApprovalStore,
    APPROVAL_WINDOW,
};
pub use classifier::{classify, normalize_command, CommandParts, RiskTier};
pub use shell_guard::check_command;
