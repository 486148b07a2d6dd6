pub mod due_item;
pub mod payment_record;

pub use due_item::DueItem;
pub use payment_record::{
    next_status, NewPaymentRecord, PaymentRecord, PaymentStatus, Transition,
};
