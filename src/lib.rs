// Parish Ledger - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod error;
pub mod currency;
pub mod entities;
pub mod api;
pub mod thunk;
pub mod events;
pub mod store;
pub mod auth;
pub mod receipt;
pub mod export;

#[cfg(feature = "server")]
pub mod http;

// Re-export commonly used types
pub use config::{Config, Latency};
pub use error::{ApiError, ApiResult};
pub use currency::{format_currency, format_total, parse_amount, add_to_total};
pub use entities::{
    Forane, NewForane, ForanePatch,
    Parish, NewParish, ParishPatch,
    Community, NewCommunity, CommunityPatch, ParentKind, ParentRef,
    Family, NewFamily, FamilyPatch,
    Individual, NewIndividual, IndividualPatch,
    Institution, NewInstitution, InstitutionPatch,
    Contribution, NewContribution, ContributionOwner,
    Record, HasTotal,
};
pub use api::{MockApi, MockDb, ContributionAdded, ContributionRemoved};
pub use thunk::{run_thunk, ActionStatus, Rejection, ThunkResult};
pub use events::{Change, ChangeEvent, EventBus, Topic};
pub use store::{Store, LedgerState, CacheEntry, CachePhase, KeyedSlice, ListSlice};
pub use auth::{AuthSlice, AuthState, SessionStore, SessionError, User};
pub use receipt::{
    ReceiptPayload, ReceiptField, ReceiptMetadata, ReceiptOutput, ReceiptWriter,
    PrintSpooler, CommandSpooler, Delivered, ReceiptError,
};
pub use export::write_contributions_csv;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
