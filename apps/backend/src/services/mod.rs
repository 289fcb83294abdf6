pub mod password;
pub mod review;
pub mod storage;
