#![allow(dead_code)]

pub mod calendar_mock;
