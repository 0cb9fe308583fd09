use std::{
    fmt::Write as _,
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use chrono::{format::DelayedFormat, DateTime, Local, NaiveDate};
use crossbeam_channel::{bounded, unbounded, Sender};
use once_cell::sync::Lazy;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("monitor"));

const LOG_DIR: &str = "log";
/// 累積到這個大小就寫入檔案
const BATCH_SIZE: usize = 4096;

pub struct Logger {
    writer: Sender<Command>,
}

enum Command {
    Write(LogMessage),
    /// 寫出尚未落地的內容後回覆
    Flush(Sender<()>),
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let (tx, rx) = unbounded::<Command>();
        let mut sink = DailyFile::new(log_name);

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut batch = String::with_capacity(BATCH_SIZE);
            let mut batch_day: Option<DateTime<Local>> = None;

            while let Ok(command) = rx.recv() {
                let received = match command {
                    Command::Write(received) => received,
                    Command::Flush(ack) => {
                        if let Some(started) = batch_day.take() {
                            sink.write_batch(started, &mut batch);
                        }
                        let _ = ack.send(());
                        continue;
                    }
                };

                // 跨日時先把前一天的內容寫進前一天的檔案
                if let Some(started) = batch_day {
                    if started.date_naive() != received.created_at.date_naive() {
                        sink.write_batch(started, &mut batch);
                    }
                }

                if writeln!(
                    &mut batch,
                    "{} {} {}",
                    received.created_at.format("%F %X%.6f"),
                    received.level,
                    received.msg
                )
                .is_err()
                {
                    continue;
                }
                batch_day = Some(received.created_at);

                if rx.is_empty() || batch.len() >= BATCH_SIZE {
                    sink.write_batch(received.created_at, &mut batch);
                    batch_day = None;
                }
            }
        });

        Logger { writer: tx }
    }

    pub fn info(&self, log: String) {
        self.send(log::Level::Info, log);
    }

    pub fn error(&self, log: String) {
        self.send(log::Level::Error, log);
    }

    /// Blocks until every message queued before this call is on disk, or `wait` runs out.
    /// Returns false when the writer thread did not answer in time.
    pub fn flush(&self, wait: Duration) -> bool {
        let (ack, done) = bounded::<()>(1);
        if self.writer.send(Command::Flush(ack)).is_err() {
            return false;
        }

        done.recv_timeout(wait).is_ok()
    }

    fn send(&self, level: log::Level, msg: String) {
        if let Err(why) = self.writer.send(Command::Write(LogMessage::new(level, msg))) {
            error_console(why.to_string());
        }
    }
}

/// 依日期切換的日誌檔
struct DailyFile {
    name: String,
    day: Option<NaiveDate>,
    out: Option<BufWriter<File>>,
}

impl DailyFile {
    fn new(name: &str) -> Self {
        DailyFile {
            name: name.to_string(),
            day: None,
            out: None,
        }
    }

    /// Writes the pending lines into the file of `at`'s day and clears the batch.
    /// Falls back to the console when the file cannot be written.
    fn write_batch(&mut self, at: DateTime<Local>, batch: &mut String) {
        if batch.is_empty() {
            return;
        }

        let written = match self.writer_for(at.date_naive()) {
            Some(out) => out.write_all(batch.as_bytes()).and_then(|_| out.flush()).is_ok(),
            None => false,
        };

        if !written {
            info_console(batch.trim_end().to_string());
        }

        batch.clear();
    }

    fn writer_for(&mut self, day: NaiveDate) -> Option<&mut BufWriter<File>> {
        if self.day != Some(day) || self.out.is_none() {
            self.out = open_log_file(&log_path(&self.name, day)).map(BufWriter::new);
            self.day = Some(day);
        }

        self.out.as_mut()
    }
}

fn open_log_file(path: &Path) -> Option<File> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir).ok()?;
        }
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(why) => {
            error_console(format!("Failed to open log file {:?} because {:?}", path, why));
            None
        }
    }
}

/// 回傳日誌檔的路徑 log/{name}_{yyyy-mm-dd}.log
fn log_path(name: &str, day: NaiveDate) -> PathBuf {
    let mut path = PathBuf::from(LOG_DIR);
    path.push(format!("{}_{}.log", name, day.format("%Y-%m-%d")));
    path
}

pub struct LogMessage {
    pub level: log::Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

/// 結束前呼叫，確保背景線程中的日誌已寫入檔案
pub fn flush_file(wait: Duration) -> bool {
    LOGGER.flush(wait)
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}

/// 不加前綴直接輸出到 console
pub fn println_console(line: &str) {
    println!("{}", line);
}
