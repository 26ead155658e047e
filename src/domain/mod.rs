//! Pure marketplace logic: money handling, catalog filters, cart aggregation
//! and checkout drafting. Nothing in here touches the database or the network.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod money;
