pub mod discount;
pub mod event;
pub mod purchase;
pub mod ticket;
pub mod tier;
pub mod transfer;

pub use discount::{DiscountKind, GroupDiscount, PromoCode};
pub use event::{Event, EventStatus};
pub use purchase::Purchase;
pub use ticket::{Ticket, TicketStatus, TRANSFER_LIMIT};
pub use tier::Tier;
pub use transfer::{TransferRequest, TRANSFER_TTL_HOURS};
