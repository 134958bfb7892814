// === Members and Hierarchy ===
pub mod member;
pub mod registry;
pub mod upline;

// === Sales ===
pub mod sale;

// === Re-exports for broader ecosystem access ===
pub use member::{BusinessId, Member, MemberError, MemberRole};
pub use registry::{DownlineEntry, MemberDirectory, MemberRegistry, RegistryError};
pub use sale::{Amount, OrderedItem, SaleError, MINOR_UNITS_PER_MAJOR};
pub use upline::{resolve_upline, sale_upline, Termination, Upline, UplineResolver, MAX_GENERATIONS};
