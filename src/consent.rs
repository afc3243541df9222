use anyhow::Result;
use chrono::Datelike;

use crate::local::{LocalStore, KEY_APPLY_NAME, KEY_CONSENT};

const TITLE: &str = "개인정보 수집·이용 및 제공·조회 동의서";

const BODY: &[&str] = &[
    "귀 회사는 지원자의 개인정보를 중요시하며, \"개인정보보호법\"에 관한 법률을 준수하고 있습니다.",
    "회사는 개인정보취급방침을 통하여 지원자께서 제공하시는 개인정보가 어떠한 용도와 방식으로 이용되고 있으며, \
     개인정보보호를 위해 어떠한 조치가 취해지고 있는지 알려드립니다.",
    "",
    "1. 수집하는 개인정보 항목",
    "  - 입사지원 관련사항 : 이름, 생년월일, 연락처, 주소, 전자메일, 경력, 자격증 등",
    "  - 개인정보 수집은 서류제출로 이루어집니다.",
    "",
    "2. 개인정보의 수집 및 이용 목적",
    "  - 채용 전형의 진행, 지원자 본인 확인 및 채용 결과 안내",
    "",
    "3. 개인정보의 보유 및 이용 기간",
    "  - 채용 전형 종료 후 관련 법령에 따른 기간 동안 보관 후 파기합니다.",
];

const DISCLAIMER: &str = "※ 귀하는 상기 개인정보의 수집·이용에 대한 동의를 거부할 수 있습니다. \
     다만, 이에 대한 동의를 하지 않을 경우에는 입사지원신청에 대한 채용업무 과정에서 불이익을 받을 수 있음을 알려드립니다.";

/// Whether the applicant has agreed to personal data collection.
pub fn is_agreed(local: &LocalStore) -> bool {
    local.get(KEY_CONSENT) == Some("true")
}

/// Records the applicant's choice. Declining is stored too, and still blocks
/// submission.
pub fn record_choice(local: &mut LocalStore, agreed: bool) -> Result<()> {
    local.set(KEY_CONSENT, if agreed { "true" } else { "false" })
}

/// Saves the name typed on the form so the consent document can show it.
pub fn remember_applicant_name(local: &mut LocalStore, name: &str) -> Result<()> {
    local.set(KEY_APPLY_NAME, name.trim())
}

/// Drops the consent flag and the remembered name after a submission.
pub fn clear(local: &mut LocalStore) -> Result<()> {
    local.remove(KEY_CONSENT)?;
    local.remove(KEY_APPLY_NAME)
}

/// Renders the consent document, dated `date` and signed with the remembered
/// applicant name (or a blank line).
pub fn render_document(local: &LocalStore, date: chrono::NaiveDate) -> String {
    let name = local
        .get(KEY_APPLY_NAME)
        .filter(|n| !n.is_empty())
        .unwrap_or("______");

    let mut out = String::new();
    out.push_str(TITLE);
    out.push('\n');
    out.push_str(&"=".repeat(40));
    out.push_str("\n\n");
    for line in BODY {
        if line.is_empty() {
            out.push('\n');
            continue;
        }
        for wrapped in textwrap::wrap(line, 72) {
            out.push_str(&wrapped);
            out.push('\n');
        }
    }
    out.push('\n');
    for wrapped in textwrap::wrap(DISCLAIMER, 72) {
        out.push_str(&wrapped);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&format!(
        "{} 년   {} 월   {} 일\n",
        date.year(),
        date.month(),
        date.day()
    ));
    out.push_str(&format!("지원자 : {} (인)\n", name));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalStore::open(&dir.path().join("local.json")).unwrap();
        (dir, local)
    }

    #[test]
    fn test_choice_controls_agreement() {
        let (_dir, mut local) = store();
        assert!(!is_agreed(&local));
        record_choice(&mut local, false).unwrap();
        assert!(!is_agreed(&local));
        record_choice(&mut local, true).unwrap();
        assert!(is_agreed(&local));
        clear(&mut local).unwrap();
        assert!(!is_agreed(&local));
    }

    #[test]
    fn test_document_shows_date_and_name() {
        let (_dir, mut local) = store();
        let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

        let blank = render_document(&local, date);
        assert!(blank.starts_with(TITLE));
        assert!(blank.contains("2026 년   3 월   9 일"));
        assert!(blank.contains("지원자 : ______"));

        remember_applicant_name(&mut local, " 홍길동 ").unwrap();
        let signed = render_document(&local, date);
        assert!(signed.contains("지원자 : 홍길동 (인)"));
    }
}
