/*
 * Responsibility
 * - ドメインロジック (HTTP/axum に依存しない部分) をまとめる
 */
pub mod auth;
