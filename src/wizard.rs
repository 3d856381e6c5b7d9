//! 対話式チェックイン/チェックアウト
//!
//! 端末上でフォームの各段階を入力する。描き込みはストローク履歴のJSONを読み込んで
//! 車両図に合成する（ペン入力のできるフロントエンドで作成したもの）。

use crate::api::{FleetBackend, VehicleData};
use crate::canvas::{Compositor, DrawingCanvas};
use crate::compress::{Compressor, PhotoInput};
use crate::config::Config;
use crate::controller::{FormController, KmStatus, KmValidator};
use crate::draft::DraftStore;
use crate::error::{FleetError, Result};
use crate::scanner;
use crate::session::{self, SessionContext};
use dialoguer::{Confirm, Input, Select};
use fleet_checkin_common::fuel::{filled_segments, SEGMENTS};
use fleet_checkin_common::{format_brl_amount, gauge_line, segment_value, OperationType, Step, StrokeHistory};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// ブランクの車両図の寸法
const BLANK_DIAGRAM: (u32, u32) = (800, 500);
/// 描き込みの初期表示幅
const CANVAS_WIDTH: u32 = 600;

/// ウィザードの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardOutcome {
    Submitted(String),
    Cancelled,
}

enum Navigation {
    Next,
    Back,
    Cancel,
}

/// バッチ処理用の進捗バー
pub fn batch_progress(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("  [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

/// エラーをトースト風に表示
pub fn print_error(err: &FleetError) {
    eprintln!("✖ {}: {}", err.toast_title(), err.user_message());
}

pub fn print_vehicle(vehicle: &VehicleData) {
    println!("🚗 {} {}", vehicle.placa, vehicle.modelo);
    if let Some(marca) = &vehicle.marca {
        println!("  Marca: {}", marca);
    }
    if vehicle.ano > 0 {
        println!("  Ano: {}", vehicle.ano);
    }
    println!("  Cor: {}", vehicle.cor);
    println!("  KM atual: {}", vehicle.km);
    println!("  Combustível: {}", gauge_line(vehicle.combustivel));
    println!("  Responsável: {}", vehicle.responsavel);
    println!();
}

/// 対話式でフォームを入力して送信
pub async fn run_wizard<S, B>(
    form: &mut FormController<S>,
    ctx: &SessionContext,
    backend: &B,
    config: &Config,
) -> Result<WizardOutcome>
where
    S: DraftStore,
    B: FleetBackend + KmValidator,
{
    let compressor = Compressor::new(config.compression.clone());
    let operation = form.operation();
    println!("📋 {} - {}\n", operation.title(), ctx.vehicle.placa);

    loop {
        let step = form.current_step();
        println!(
            "[{}/{}] {}",
            form.step_number(),
            form.steps().len(),
            step.label(operation)
        );

        let step_result = match step {
            Step::Details => edit_details(form, backend).await,
            Step::Fueling => edit_fueling(form, &compressor).await,
            Step::Conditions => edit_conditions(form, &compressor, config).await,
            Step::Notes => edit_notes(form),
            Step::Confirm => {
                print_summary(form);
                match prompt_confirm_action()? {
                    Navigation::Next => match submit_with_retry(form, backend, config).await {
                        Ok(message) => return Ok(WizardOutcome::Submitted(message)),
                        Err(e) => {
                            print_error(&e);
                            continue;
                        }
                    },
                    Navigation::Back => {
                        form.back();
                        continue;
                    }
                    Navigation::Cancel => {
                        if cancel(form)? {
                            return Ok(WizardOutcome::Cancelled);
                        }
                        continue;
                    }
                }
            }
        };
        if let Err(e) = step_result {
            print_error(&e);
        }

        match prompt_navigation(form.step_number() > 1)? {
            Navigation::Next => {
                if let Err(e) = form.next() {
                    print_error(&e);
                }
            }
            Navigation::Back => {
                form.back();
            }
            Navigation::Cancel => {
                if cancel(form)? {
                    return Ok(WizardOutcome::Cancelled);
                }
            }
        }
        println!();
    }
}

fn prompt_navigation(can_go_back: bool) -> Result<Navigation> {
    let mut items = vec!["Próximo"];
    if can_go_back {
        items.push("Voltar");
    }
    items.push("Cancelar");

    let choice = Select::new().items(&items).default(0).interact()?;
    Ok(match items[choice] {
        "Próximo" => Navigation::Next,
        "Voltar" => Navigation::Back,
        _ => Navigation::Cancel,
    })
}

fn prompt_confirm_action() -> Result<Navigation> {
    let items = ["Enviar", "Voltar", "Cancelar"];
    let choice = Select::new().items(&items).default(0).interact()?;
    Ok(match choice {
        0 => Navigation::Next,
        1 => Navigation::Back,
        _ => Navigation::Cancel,
    })
}

fn cancel<S: DraftStore>(form: &mut FormController<S>) -> Result<bool> {
    let mut prompt_error = None;
    let discarded = form.cancel(|message| {
        match Confirm::new().with_prompt(message).default(false).interact() {
            Ok(answer) => answer,
            Err(e) => {
                prompt_error = Some(e);
                false
            }
        }
    })?;
    if let Some(e) = prompt_error {
        return Err(e.into());
    }
    Ok(discarded)
}

async fn edit_details<S, V>(form: &mut FormController<S>, validator: &V) -> Result<()>
where
    S: DraftStore,
    V: KmValidator,
{
    let operation = form.operation();

    let km: String = Input::new()
        .with_prompt(format!("KM de {}", operation.moment_label()))
        .with_initial_text(form.draft().km.clone())
        .allow_empty(true)
        .interact_text()?;
    form.set_km(&km)?;

    match form.km_status(validator).await {
        KmStatus::Missing => {}
        KmStatus::Accepted => println!("✔ KM válida"),
        KmStatus::Rejected => eprintln!("✖ {}", FleetError::KmRejected),
        KmStatus::Unverified(e) => print_error(&e),
    }

    if operation == OperationType::CheckIn {
        let motivo: String = Input::new()
            .with_prompt("Motivo da utilização")
            .with_initial_text(form.draft().motivo.clone())
            .allow_empty(true)
            .interact_text()?;
        form.update(|d| d.motivo = motivo.trim().to_string())?;
    }

    let levels: Vec<String> = (0..SEGMENTS).map(|i| gauge_line(segment_value(i))).collect();
    let current = filled_segments(form.draft().combustivel).saturating_sub(1) as usize;
    let choice = Select::new()
        .with_prompt("Nível de combustível")
        .items(&levels)
        .default(current)
        .interact()?;
    form.set_combustivel(segment_value(choice as u8))?;
    Ok(())
}

async fn edit_fueling<S: DraftStore>(form: &mut FormController<S>, compressor: &Compressor) -> Result<()> {
    let fueled = Confirm::new()
        .with_prompt("Houve abastecimento?")
        .default(form.draft().teve_abastecimento)
        .interact()?;
    form.update(|d| d.teve_abastecimento = fueled)?;
    if !fueled {
        return Ok(());
    }

    let valor: String = Input::new()
        .with_prompt("Valor do abastecimento (R$)")
        .with_initial_text(form.draft().valor_abastecimento.clone())
        .allow_empty(true)
        .interact_text()?;
    let valor = match format_brl_amount(&valor) {
        Some(formatted) => formatted,
        None if valor.trim().is_empty() => String::new(),
        None => {
            eprintln!("✖ Valor inválido: {}", valor);
            String::new()
        }
    };
    form.update(|d| d.valor_abastecimento = valor)?;

    let receipt: String = Input::new()
        .with_prompt("Comprovante (caminho da imagem, vazio para manter)")
        .allow_empty(true)
        .interact_text()?;
    if !receipt.trim().is_empty() {
        let path = PathBuf::from(receipt.trim());
        let input = PhotoInput::File(path);
        let name = input.name();
        let image = compressor.compress_input(&name, input).await?;
        form.update(|d| d.comprovante_abastecimento = Some(image))?;
        println!("✔ Comprovante anexado");
    }
    Ok(())
}

async fn edit_conditions<S: DraftStore>(
    form: &mut FormController<S>,
    compressor: &Compressor,
    config: &Config,
) -> Result<()> {
    println!("  Fotos anexadas: {} (máximo {})", form.draft().fotos.len(), config.max_photos);

    if !form.draft().fotos.is_empty()
        && Confirm::new().with_prompt("Remover alguma foto?").default(false).interact()?
    {
        let index: usize = Input::new()
            .with_prompt(format!("Número da foto (1-{})", form.draft().fotos.len()))
            .interact_text()?;
        if index >= 1 && form.remove_photo(index - 1)? {
            println!("✔ Foto {} removida", index);
        }
    }

    let selection: String = Input::new()
        .with_prompt("Adicionar fotos (arquivos ou pastas separados por vírgula, vazio para pular)")
        .allow_empty(true)
        .interact_text()?;
    let inputs: Vec<PathBuf> = selection
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();
    if !inputs.is_empty() {
        add_photos(form, compressor, &inputs).await?;
    }

    let has_occurrence = Confirm::new()
        .with_prompt("Houve alguma ocorrência/avaria?")
        .default(form.draft().tem_ocorrencia)
        .interact()?;
    form.update(|d| d.tem_ocorrencia = has_occurrence)?;

    if has_occurrence {
        let descricao: String = Input::new()
            .with_prompt("Descrição da ocorrência")
            .with_initial_text(form.draft().descricao_ocorrencia.clone())
            .allow_empty(true)
            .interact_text()?;
        form.update(|d| d.descricao_ocorrencia = descricao.trim().to_string())?;

        let strokes: String = Input::new()
            .with_prompt("Marcação de avarias (JSON de traços, vazio para manter)")
            .allow_empty(true)
            .interact_text()?;
        if !strokes.trim().is_empty() {
            annotate(form, config, Path::new(strokes.trim()))?;
        }
    }
    Ok(())
}

async fn add_photos<S: DraftStore>(
    form: &mut FormController<S>,
    compressor: &Compressor,
    inputs: &[PathBuf],
) -> Result<()> {
    let paths = scanner::expand_inputs(inputs)?;
    let pb = batch_progress(paths.len());
    let photos = paths.into_iter().map(PhotoInput::File).collect();

    let outcome = compressor
        .compress_batch(photos, form.remaining_photos(), |_, _, name| {
            pb.set_message(name.to_string());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();
    let outcome = outcome?;

    for (name, err) in &outcome.failures {
        eprintln!("✖ {}: {}", name, err.user_message());
    }
    let added = outcome.images.len();
    form.add_photos(outcome.images)?;
    println!("✔ {} foto(s) adicionada(s)", added);
    Ok(())
}

/// ストローク履歴を車両図に合成して下書きに保存
fn annotate<S: DraftStore>(form: &mut FormController<S>, config: &Config, strokes: &Path) -> Result<()> {
    let content = std::fs::read_to_string(strokes)?;
    let history = StrokeHistory::from_json(&content)?;

    let compositor = match &config.reference_image {
        Some(path) => Compositor::open(path)?,
        None => Compositor::blank(BLANK_DIAGRAM.0, BLANK_DIAGRAM.1),
    };
    let canvas = DrawingCanvas::new(compositor, history, CANVAS_WIDTH)?;
    let image = canvas.export()?;
    let count = canvas.history().len();
    form.set_annotation(Some(image), canvas.into_history())?;
    println!("✔ {} traço(s) aplicados ao diagrama", count);
    Ok(())
}

fn edit_notes<S: DraftStore>(form: &mut FormController<S>) -> Result<()> {
    let notes: String = Input::new()
        .with_prompt("Observações")
        .with_initial_text(form.draft().observacoes.clone())
        .allow_empty(true)
        .interact_text()?;
    form.update(|d| d.observacoes = notes.trim().to_string())
}

fn print_summary<S: DraftStore>(form: &FormController<S>) {
    let draft = form.draft();
    let operation = form.operation();
    println!("  Condutor: {}", draft.condutor);
    println!("  KM: {}", draft.km);
    if operation == OperationType::CheckIn {
        println!("  Motivo: {}", draft.motivo);
    }
    println!("  Combustível: {}", gauge_line(draft.combustivel));
    if operation.is_checkout() && draft.teve_abastecimento {
        println!("  Abastecimento: R$ {}", draft.valor_abastecimento);
    }
    println!("  Fotos: {}", draft.fotos.len());
    if draft.tem_ocorrencia {
        println!("  Ocorrência: {}", draft.descricao_ocorrencia);
    }
    if !draft.observacoes.is_empty() {
        println!("  Observações: {}", draft.observacoes);
    }
}

async fn submit_with_retry<S, B>(form: &mut FormController<S>, backend: &B, config: &Config) -> Result<String>
where
    S: DraftStore,
    B: FleetBackend + KmValidator,
{
    loop {
        println!("- Enviando...");
        match session::submit(form, backend, &config.payload).await {
            Ok(message) => {
                println!("✔ {}", message);
                return Ok(message);
            }
            Err(e) if e.is_retryable() => {
                print_error(&e);
                if !Confirm::new().with_prompt("Tentar novamente?").default(true).interact()? {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}
