use memento_core::notice::{Notice, NoticeLevel, NoticeSink};

/// Prints notices to stderr so stdout stays machine-readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrNotices;

impl NoticeSink for StderrNotices {
    fn present(&self, notice: Notice) {
        eprintln!("{}", format_notice(&notice));
    }
}

pub fn format_notice(notice: &Notice) -> String {
    let marker = match notice.level {
        NoticeLevel::Blocking => "[!] ",
        NoticeLevel::Error => "[error] ",
        NoticeLevel::Info => "",
    };
    if notice.message.is_empty() {
        format!("{marker}{}", notice.title)
    } else {
        format!("{marker}{}: {}", notice.title, notice.message)
    }
}
