use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use mediaflow_core::app::error_parser;
use mediaflow_core::app::streaming::{self, StreamingKind};
use mediaflow_core::app::{
    AccessGrantManager, FileTransferOrchestrator, JobChangeHandler, JobMonitor, JobPreparer,
    MediaContextConfig,
};
use mediaflow_core::domain::media_processor::names;
use mediaflow_core::domain::{
    AccessPermissions, AssetCreationOptions, AssetFile, Job, LocatorType, MediaError,
    ProgressHandler, TransferProgress,
};
use mediaflow_core::impls::InMemoryMediaStore;
use mediaflow_core::ports::{MediaStore, SystemClock};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ENCODING_PRESET: &str = "H264 Adaptive Bitrate MP4 Set 720p";

/// サンプル入力（引数でフォルダが渡されなかったとき用）
const SAMPLE_FILES: [(&str, usize); 3] = [
    ("a.wmv", 300 * 1024),
    ("b.wmv", 120 * 1024),
    ("manifest.ism", 2 * 1024),
];

/// upload → encode → monitor → publish → download の一連の流れ
async fn run(
    config: MediaContextConfig,
    input: &Path,
    work_dir: &Path,
    cancel: &CancellationToken,
) -> Result<Job, MediaError> {
    // (A) メディアサービスと各コンポーネントを用意
    let store = Arc::new(
        InMemoryMediaStore::new(config.default_storage_account_name.clone())
            .with_media_processor(names::MEDIA_ENCODER, "4.6")
            .with_media_processor(names::MEDIA_ENCODER, "4.7")
            .with_media_processor(names::MEDIA_PACKAGER, "3.2")
            .with_simulated_processing(25.0),
    );
    let orchestrator = FileTransferOrchestrator::new(store.clone(), store.clone(), config.clone());
    let preparer = JobPreparer::new(store.clone(), Arc::new(SystemClock), config.clone());
    let monitor = JobMonitor::new(store.clone(), &config);
    let grants = AccessGrantManager::new(store.clone());

    // (B) フォルダごとアップロード（進捗はファイル単位で表示）
    let on_progress: ProgressHandler = Arc::new(|file: &AssetFile, progress: &TransferProgress| {
        println!(
            "  {:?} {} {:>6.2}%",
            progress.direction,
            file.name,
            progress.percentage()
        );
    });
    let input_asset = orchestrator
        .upload_folder(
            input,
            None,
            AssetCreationOptions::None,
            Some(on_progress.clone()),
            cancel,
        )
        .await?;
    println!(
        "uploaded asset {} ({} files, primary: {:?})",
        input_asset.id,
        input_asset.files.len(),
        input_asset.manifest_file().map(|f| &f.name)
    );

    // (C) エンコード Job を組み立てて投入
    let job = preparer
        .prepare_job_with_single_task(
            names::MEDIA_ENCODER,
            ENCODING_PRESET,
            &input_asset,
            &format!("{} - encoded", input_asset.name),
            None,
            AssetCreationOptions::None,
        )
        .await?;
    let job = store.submit_job(job).await?;
    println!("submitted {} ({})", job.name, job.id.map(|id| id.to_string()).unwrap_or_default());

    // (D) 終端状態まで監視（状態か進捗が変わったときだけ表示）
    let on_change: JobChangeHandler = Arc::new(|job: &Job| {
        println!(
            "  job state={:?} progress={:.1}%",
            job.state,
            job.overall_progress().unwrap_or(0.0)
        );
    });
    let job = monitor.monitor(job, None, Some(on_change), cancel).await?;

    let Some(output_id) = job.output_assets.first().copied() else {
        return Ok(job);
    };

    // (E) 公開: origin と SAS の Locator を発行して URL を表示・保存
    let output = store.get_asset(output_id).await?;
    for locator_type in [LocatorType::OnDemandOrigin, LocatorType::Sas] {
        grants
            .grant(
                &output,
                locator_type,
                AccessPermissions::READ,
                config.access_duration(),
                None,
            )
            .await?;
    }
    let output = store.get_asset(output_id).await?;

    let uri_file = work_dir.join("uris.txt");
    for kind in [
        StreamingKind::SmoothStreaming,
        StreamingKind::Hls,
        StreamingKind::MpegDash,
    ] {
        if let Some(url) = streaming::streaming_uri(&output, kind) {
            println!("{kind:?}: {url}");
            streaming::save_uri(&url, &uri_file).await?;
        }
    }
    for file in &output.files {
        if let Some(url) = streaming::sas_uri(&output, file) {
            println!("download {}: {url}", file.name);
            streaming::save_uri(&url, &uri_file).await?;
        }
    }

    // (F) 出力 Asset をダウンロード（保存先フォルダは事前に作る）
    let download_dir = work_dir.join("output");
    tokio::fs::create_dir_all(&download_dir).await?;
    orchestrator
        .download_all(&output, &download_dir, Some(on_progress), cancel)
        .await?;
    info!(folder = %download_dir.display(), "outputs downloaded");

    Ok(job)
}

async fn prepare_sample_input(work_dir: &Path) -> anyhow::Result<PathBuf> {
    let input = work_dir.join("input");
    tokio::fs::create_dir_all(&input)
        .await
        .with_context(|| format!("create {}", input.display()))?;
    for (name, len) in SAMPLE_FILES {
        tokio::fs::write(input.join(name), vec![0u8; len]).await?;
    }
    Ok(input)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = MediaContextConfig::from_env().context("load configuration")?;
    let work_dir = std::env::temp_dir().join("mediaflow-sample");
    tokio::fs::create_dir_all(&work_dir).await?;
    let input = match std::env::args().nth(1) {
        Some(folder) => PathBuf::from(folder),
        None => prepare_sample_input(&work_dir).await?,
    };

    // Ctrl-C で転送と監視をまとめて止める
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match run(config, &input, &work_dir, &cancel).await {
        Ok(job) => {
            println!("{}", serde_json::to_string_pretty(&job)?);
            Ok(())
        }
        Err(error) => {
            let error = match error_parser::parse(Some(error)) {
                Some(parsed) => anyhow::Error::new(parsed),
                None => anyhow::anyhow!("workflow failed without an error"),
            };
            Err(error.context("sample workflow failed"))
        }
    }
}
