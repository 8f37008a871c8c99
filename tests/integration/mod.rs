//! Integration tests with mock HTTP server

#![allow(dead_code)]

pub mod mock_server;
