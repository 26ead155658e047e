pub mod receipt;

pub use receipt::{RECEIPT_SUBJECT, ReceiptInput, RenderedEmail, render_receipt};
