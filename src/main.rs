// ==========================================
// 仓库容量与审计引擎 - 命令行入口
// ==========================================
// 用法:
//   warehouse-capacity report  [db_path]          输出仓库重量报表 (CSV)
//   warehouse-capacity history [db_path] [limit]  输出最近的变更历史
//   warehouse-capacity config  [db_path]          输出生效配置 (JSON)
// db_path 缺省时使用 WAREHOUSE_CAPACITY_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{bail, Context, Result};
use warehouse_capacity::db::default_db_path;
use warehouse_capacity::{logging, ReportPolicy, Store, WarehouseReport};

const DEFAULT_HISTORY_LIMIT: usize = 20;

fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "report".to_string());
    let db_path = args.next().unwrap_or_else(default_db_path);

    tracing::info!(version = warehouse_capacity::VERSION, db_path = %db_path, command = %command, "启动");

    let store = Store::open(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;

    match command.as_str() {
        "report" => {
            let graph = store.snapshot()?;
            let report = WarehouseReport::build(&graph, &ReportPolicy::default());
            report.write_csv(std::io::stdout().lock())?;
        }
        "history" => {
            let limit = match args.next() {
                Some(raw) => raw
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("limit 不是合法数字: {}", raw))?,
                None => DEFAULT_HISTORY_LIMIT,
            };
            for record in store.recent_history(limit)? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.actor,
                    record.action_type,
                    record
                        .weight_change
                        .map(|w| format!("{:.3}", w))
                        .unwrap_or_default(),
                    record.detail,
                );
            }
        }
        "config" => {
            println!("{}", serde_json::to_string_pretty(store.config())?);
        }
        other => bail!("未知命令: {} (可用: report / history / config)", other),
    }

    Ok(())
}
