pub(crate) mod finish;
pub mod request_id;
