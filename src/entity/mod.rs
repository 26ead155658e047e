pub mod audit_logs;
pub mod cart;
pub mod email_outbox;
pub mod orders;
pub mod payment_claims;
pub mod products;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart::Entity as Cart;
pub use email_outbox::Entity as EmailOutbox;
pub use orders::Entity as Orders;
pub use payment_claims::Entity as PaymentClaims;
pub use products::Entity as Products;
pub use users::Entity as Users;
