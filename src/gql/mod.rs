pub mod query_interface;
