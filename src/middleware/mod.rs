//! 요청 단위 인증 extractor

pub mod auth;
