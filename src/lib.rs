pub mod api;
pub mod client;
pub mod gql;
pub mod graph_utils;
pub mod gui;
pub mod persistence;
pub mod view;
