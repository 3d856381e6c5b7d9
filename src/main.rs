use anyhow::Context;
use clap::Parser;
use dialoguer::Confirm;
use fleet_checkin::{api, cancel, canvas, cli, compress, config, controller, draft, scanner, session, wizard};
use api::HttpBackend;
use cancel::CancelToken;
use canvas::{Compositor, DrawingCanvas};
use cli::{Cli, Commands};
use compress::{Compressor, PhotoInput};
use config::Config;
use controller::FormController;
use draft::{load_draft, DraftStore, FileDraftStore};
use fleet_checkin_common::{draft_key, gauge_line, StrokeHistory};
use std::path::PathBuf;
use wizard::WizardOutcome;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = Config::load().context("設定の読み込みに失敗")?;

    match cli.command {
        Commands::Run { id_frota, id_empresa, condutor } => {
            println!("🚗 fleet-checkin\n");

            let backend = HttpBackend::new(&config.base_url, config.timeout())?;
            let token = CancelToken::new();
            let _cancel_on_exit = token.drop_guard();

            println!("- Validando QR Code...");
            let opened = session::retrying(
                || session::open_session(&backend, &id_frota, &id_empresa, &token),
                |e| {
                    wizard::print_error(e);
                    Confirm::new()
                        .with_prompt("Tentar novamente?")
                        .default(true)
                        .interact()
                        .unwrap_or(false)
                },
            )
            .await;
            let ctx = opened?;
            wizard::print_vehicle(&ctx.vehicle);

            let store = FileDraftStore::new(config.draft_dir()?);
            let mut form = FormController::mount(ctx.operation, ctx.ids.clone(), &condutor, config.api_key(), store)
                .with_max_photos(config.max_photos);

            match wizard::run_wizard(&mut form, &ctx, &backend, &config).await? {
                WizardOutcome::Submitted(message) => println!("\n✅ {}", message),
                WizardOutcome::Cancelled => println!("\nOperação cancelada."),
            }
        }

        Commands::Compress { inputs, output } => {
            println!("📸 fleet-checkin - compressão\n");

            let paths = scanner::expand_inputs(&inputs)?;
            if paths.is_empty() {
                anyhow::bail!("Nenhuma imagem encontrada");
            }
            std::fs::create_dir_all(&output)
                .with_context(|| format!("出力フォルダを作成できない: {}", output.display()))?;

            let compressor = Compressor::new(config.compression.clone());
            let total = paths.len();
            let pb = wizard::batch_progress(total);
            let mut compressed = 0;

            for path in paths {
                let input = PhotoInput::File(path.clone());
                let name = input.name();
                pb.set_message(name.clone());
                let result = compressor.compress_input(&name, input).await;
                pb.inc(1);

                match result {
                    Ok(image) => {
                        let stem = path
                            .file_stem()
                            .map(|s| s.to_string_lossy().to_string())
                            .unwrap_or_else(|| "foto".into());
                        let target = output.join(format!("{}.{}", stem, image.extension()));
                        std::fs::write(&target, &image.bytes)
                            .with_context(|| format!("書き込み失敗: {}", target.display()))?;
                        pb.println(format!("✔ {} ({:.1} KB)", target.display(), image.len() as f64 / 1024.0));
                        compressed += 1;
                    }
                    Err(e) => pb.println(format!("✖ {}: {}", name, e.user_message())),
                }
            }
            pb.finish_and_clear();

            println!("\n✅ {}/{} imagens comprimidas", compressed, total);
        }

        Commands::Annotate { strokes, output, diagram, width, export } => {
            let content = std::fs::read_to_string(&strokes)
                .with_context(|| format!("読み込み失敗: {}", strokes.display()))?;
            let history = StrokeHistory::from_json(&content)?;

            let diagram: Option<PathBuf> = diagram.or_else(|| config.reference_image.clone());
            let compositor = match &diagram {
                Some(path) => Compositor::open(path)?,
                None => Compositor::blank(800, 500),
            };
            let canvas = DrawingCanvas::new(compositor, history, width)?;
            let image = if export {
                canvas.export()?
            } else {
                canvas
                    .output()
                    .cloned()
                    .context("Não foi possível renderizar o desenho")?
            };
            std::fs::write(&output, &image.bytes)?;
            println!("✔ {} traço(s) → {}", canvas.history().len(), output.display());
        }

        Commands::Draft { op, id_frota, show, clear } => {
            let mut store = FileDraftStore::new(config.draft_dir()?);
            let key = draft_key(op, &id_frota);

            if show || !clear {
                match load_draft(&store, &key) {
                    Some(draft) => {
                        println!("Rascunho {}:", key);
                        println!("  Condutor: {}", draft.condutor);
                        println!("  KM: {}", draft.km);
                        println!("  Combustível: {}", gauge_line(draft.combustivel));
                        println!("  Fotos: {}", draft.fotos.len());
                        println!("  Traços de avaria: {}", draft.desenho_avaria_history.len());
                        println!("  Arquivo: {}", store.path_for(&key).display());
                    }
                    None => println!("Nenhum rascunho para {}", key),
                }
            }

            if clear {
                if store.clear(&key)? {
                    println!("✔ Rascunho removido");
                } else {
                    println!("Nenhum rascunho para remover");
                }
            }
        }

        Commands::Config { show, set_api_key, set_base_url } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }
            if let Some(url) = set_base_url {
                config.set_base_url(url)?;
                println!("✔ URLを設定しました");
            }

            if show {
                println!("設定:");
                println!("  URL: {}", config.base_url);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  写真上限: {}枚", config.max_photos);
                println!(
                    "  圧縮: 最大{}px / {}MB / 品質{}",
                    config.compression.max_dimension, config.compression.max_size_mb, config.compression.initial_quality
                );
                println!("  APIキー: {}", if config.api_key().is_empty() { "未設定" } else { "設定済み" });
                println!("  下書き: {}", config.draft_dir()?.display());
            }
        }
    }

    Ok(())
}
