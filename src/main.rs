use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use idcard_registry::{
    decode, load_area_index, spawn_import, AreaIndex, ImportEvent, InsertOutcome, Record,
    RecordStore, RegistryError,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("query") if args.len() == 3 => run_query(&args[2]),
        Some("insert") if args.len() == 4 => run_insert(&args[2], &args[3]),
        Some("import") if args.len() == 3 => run_import(PathBuf::from(&args[2])),
        Some("decode") if args.len() == 3 => run_decode(&args[2]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    eprintln!("idcard-registry {}", idcard_registry::VERSION);
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  idcard-registry query  <name>            look up a stored record");
    eprintln!("  idcard-registry insert <name> <number>   validate and store a record");
    eprintln!("  idcard-registry import <file>            batch import 'number name' lines");
    eprintln!("  idcard-registry decode <number>          decode without storing");
    eprintln!();
    eprintln!("Data files live under ./config (override with SFZ_DATA_DIR).");
}

fn data_dir() -> PathBuf {
    env::var_os("SFZ_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config"))
}

// The area index is fatal at startup: nothing works without it.
fn load_index() -> Result<AreaIndex> {
    load_area_index(&data_dir().join("area_code.json"))
        .context("行政区划数据加载失败")
}

fn load_store() -> Result<RecordStore> {
    RecordStore::load(data_dir().join("database.sfz")).context("无法读取数据库文件")
}

fn run_query(name: &str) -> Result<()> {
    let name = name.trim();
    let index = load_index()?;
    let store = load_store()?;

    match store.lookup(name) {
        Some(record) => print_record(record, &index),
        None => println!("未找到记录：{}", name),
    }
    println!("记录总数：{}", store.len());
    Ok(())
}

fn run_insert(name: &str, id_number: &str) -> Result<()> {
    let name = name.trim();
    let id_number = id_number.trim();
    let index = load_index()?;
    let mut store = load_store()?;

    match store.insert(name, id_number, &index) {
        Ok(InsertOutcome::Inserted) => {
            println!("✓ 记录已保存");
            if let Some(record) = store.lookup(name) {
                print_record(record, &index);
            }
        }
        Ok(InsertOutcome::AlreadyPresent) => println!("记录已存在"),
        Err(err @ RegistryError::Conflict { .. }) => {
            eprintln!("冲突：该姓名已存在不同身份证 ({})", err);
            std::process::exit(1);
        }
        Err(err @ RegistryError::Validation(_)) => {
            eprintln!("身份证格式错误：{}", err);
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn run_import(path: PathBuf) -> Result<()> {
    let index = Arc::new(load_index()?);
    let store = Arc::new(Mutex::new(load_store()?));
    let (tx, rx) = mpsc::channel();

    let handle = spawn_import(store.clone(), index, path, tx);

    // The import runs on its own thread; this loop ends once the
    // terminal event arrives and the sender is dropped.
    let mut aborted = None;
    for event in rx {
        match event {
            ImportEvent::Progress(s) => println!(
                "导入中... 成功：{} 失败：{} 总数：{}",
                s.success,
                s.failed,
                s.total_processed()
            ),
            ImportEvent::Finished(s) => {
                println!("导入完成：成功 {} 条，失败 {} 条", s.success, s.failed)
            }
            ImportEvent::Failed(err) => aborted = Some(err),
        }
    }
    let _ = handle.join();

    if let Some(err) = aborted {
        let label = import_failure_label(&err);
        return Err(anyhow::Error::from(err).context(label));
    }
    let store = store.lock().unwrap_or_else(|p| p.into_inner());
    println!("记录总数：{}", store.len());
    Ok(())
}

/// Message prefix for a whole-file import abort. The encoding case gets
/// its own wording so the user knows to re-save the file as UTF-8 rather
/// than hunt for a missing file.
fn import_failure_label(err: &RegistryError) -> &'static str {
    match err {
        RegistryError::Encoding { .. } => "编码错误：文件不是UTF-8格式",
        RegistryError::Io(_) => "文件错误：无法读取导入文件",
        _ => "导入错误：文件处理失败",
    }
}

fn run_decode(id_number: &str) -> Result<()> {
    let id_number = id_number.trim();
    let index = load_index()?;

    if let Err(err) = idcard_registry::check(id_number) {
        eprintln!("身份证格式错误：{}", err);
        std::process::exit(1);
    }

    let info = decode(id_number, &index);
    println!("身份证号：{}", id_number);
    println!("户 籍 地：{}", info.location);
    println!("出生日期：{}", info.birth_date);
    println!("性　　别：{}", info.gender);
    Ok(())
}

fn print_record(record: &Record, index: &AreaIndex) {
    println!("姓　　名：{}", record.name);
    println!("身份证号：{}", record.id_number);
    // a hand-edited log can hold a number decode() must not see
    if idcard_registry::validate(&record.id_number) {
        let info = decode(&record.id_number, index);
        println!("户 籍 地：{}", info.location);
        println!("出生日期：{}", info.birth_date);
        println!("性　　别：{}", info.gender);
    } else {
        println!("户 籍 地：{}", record.area_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_import_failure_labels_distinguish_encoding_from_io() {
        let encoding = RegistryError::Encoding {
            path: PathBuf::from("batch.txt"),
        };
        let missing = RegistryError::Io(io::Error::new(io::ErrorKind::NotFound, "no such file"));

        assert_eq!(import_failure_label(&encoding), "编码错误：文件不是UTF-8格式");
        assert_eq!(import_failure_label(&missing), "文件错误：无法读取导入文件");
        assert_ne!(
            import_failure_label(&encoding),
            import_failure_label(&missing)
        );
    }
}
