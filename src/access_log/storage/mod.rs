mod postgres;
mod sqlite;
mod store_type;

pub(crate) use store_type::AccessLogStore;
