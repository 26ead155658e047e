//! External collaborators: object storage, email delivery and payments.
//! Each sits behind an async trait so handlers can be exercised with mocks.

pub mod mailer;
pub mod payments;
pub mod storage;

pub use mailer::{DisabledMailer, EmailMessage, Mailer, MailerError, ResendMailer};
pub use payments::{DisabledPayments, PaymentCapture, PaymentError, PaymentGateway, PaypalGateway};
pub use storage::{
    AssetKind, CloudinaryStorage, DisabledStorage, ObjectStorage, StorageError, StoredObject,
    UploadRequest,
};
