//! mediaflow-core
//!
//! Transfer and monitoring building blocks for a remote media service.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, asset, locator, job, media_processor, progress, errors）
//! - **ports**: 抽象化レイヤー（MediaStore, BlobTransfer, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（grant, transfer, monitor, jobs, streaming, error_parser）
//! - **impls**: 実装（InMemoryMediaStore など開発用）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
