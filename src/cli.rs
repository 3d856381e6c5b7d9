use clap::{Parser, Subcommand};
use fleet_checkin_common::OperationType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fleet-checkin")]
#[command(about = "車両チェックイン/チェックアウト ウィザード", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// QRリンクのパラメータからチェックイン/チェックアウトを実行
    Run {
        /// 車両ID（idFrota）
        #[arg(long)]
        id_frota: String,

        /// 会社ID（idEmpresa）
        #[arg(long)]
        id_empresa: String,

        /// 運転者名
        #[arg(short, long, default_value = "")]
        condutor: String,
    },

    /// 写真を送信用に圧縮
    Compress {
        /// 写真ファイルまたはフォルダ
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 出力フォルダ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// ストローク履歴（JSON）を車両図に合成
    Annotate {
        /// ストローク履歴JSONファイル
        #[arg(short, long)]
        strokes: PathBuf,

        /// 出力PNGファイル
        #[arg(short, long, default_value = "desenho_avaria.png")]
        output: PathBuf,

        /// 車両図（省略時は設定値、なければ白紙）
        #[arg(short, long)]
        diagram: Option<PathBuf>,

        /// 表示幅（px）
        #[arg(short, long, default_value = "600")]
        width: u32,

        /// 元画像サイズで出力
        #[arg(long)]
        export: bool,
    },

    /// 下書きを表示/削除
    Draft {
        /// 操作種別 (checkin/checkout)
        #[arg(long)]
        op: OperationType,

        /// 車両ID
        #[arg(long)]
        id_frota: String,

        /// 下書きを表示
        #[arg(long)]
        show: bool,

        /// 下書きを削除
        #[arg(long)]
        clear: bool,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// バックエンドURLを設定
        #[arg(long)]
        set_base_url: Option<String>,
    },
}
