#![allow(dead_code)]

pub mod clamd;
pub mod readers;
pub mod scanner;
pub mod storage;
