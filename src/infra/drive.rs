//! Google Drive v3 client that finds the newest matching spreadsheet and
//! decodes its first sheet into a [`Dataset`].

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use calamine::{Data, Reader, Xlsx};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::domain::settings::{DriveSettings, NetworkSettings};
use crate::domain::Dataset;

use super::http_client;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3/";
const GOOGLE_SHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Service-account key files looked for when none is configured, in order.
pub const KEY_FILE_CANDIDATES: [&str; 3] =
    ["boke_key.json", "drive_key.json", "client_secret.json"];

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("no drive credentials configured")]
    MissingCredentials,
    #[error("service account error: {0}")]
    ServiceAccount(#[from] gcp_auth::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no spreadsheet matching `{0}`")]
    NotFound(String),
    #[error("unsupported file type {0}")]
    UnsupportedMime(String),
    #[error("csv decode error: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook decode error: {0}")]
    Workbook(#[from] calamine::XlsxError),
    #[error("workbook has no worksheets")]
    EmptyWorkbook,
}

#[derive(Clone)]
enum DriveAuth {
    Bearer(String),
    ServiceAccount(Arc<CustomServiceAccount>),
    ApiKey(String),
}

impl DriveAuth {
    /// Access token, then service-account key file, then API key.
    fn from_settings(drive: &DriveSettings) -> Result<Self, DriveError> {
        if let Some(token) = &drive.access_token {
            return Ok(Self::Bearer(token.clone()));
        }
        if let Some(path) = &drive.service_account_key {
            let account = CustomServiceAccount::from_file(path)?;
            log::debug!("[drive] using service account key {}", path.display());
            return Ok(Self::ServiceAccount(Arc::new(account)));
        }
        match &drive.api_key {
            Some(key) => Ok(Self::ApiKey(key.clone())),
            None => Err(DriveError::MissingCredentials),
        }
    }
}

/// First candidate key file found, searching `dirs` in order.
pub fn find_key_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| KEY_FILE_CANDIDATES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Directories searched for a key file: the working directory, then the config dir.
pub fn key_file_search_dirs(config_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    dirs.extend(config_dir.map(Path::to_path_buf));
    dirs
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<String>,
}

impl DriveFile {
    fn modified_at(&self) -> Option<OffsetDateTime> {
        self.modified_time
            .as_deref()
            .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
    auth: DriveAuth,
}

impl DriveClient {
    pub fn new(drive: &DriveSettings, network: &NetworkSettings) -> Result<Self, DriveError> {
        Self::with_base_url(DEFAULT_BASE_URL, drive, network)
    }

    pub fn with_base_url(
        base: &str,
        drive: &DriveSettings,
        network: &NetworkSettings,
    ) -> Result<Self, DriveError> {
        let auth = DriveAuth::from_settings(drive)?;
        let base_url = Url::parse(base)?;
        let http = http_client(network, std::time::Duration::from_secs(30))?;
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    /// Newest non-trashed spreadsheet whose name contains `pattern`.
    pub async fn find_latest_spreadsheet(&self, pattern: &str) -> Result<DriveFile, DriveError> {
        let mut url = self.url("files")?;
        url.query_pairs_mut()
            .append_pair("q", &search_query(pattern))
            .append_pair("fields", "files(id,name,mimeType,modifiedTime)")
            .append_pair("orderBy", "modifiedTime desc")
            .append_pair("pageSize", "10");

        let list: FileList = self
            .authorised(self.http.get(url))
            .await?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        log::debug!("[drive] {} candidate files for `{pattern}`", list.files.len());

        list.files
            .into_iter()
            .max_by_key(|file| file.modified_at().map(|t| t.unix_timestamp()).unwrap_or(i64::MIN))
            .ok_or_else(|| DriveError::NotFound(pattern.to_string()))
    }

    /// Downloads `file` and keeps the header plus at most `row_limit` rows.
    pub async fn download_dataset(
        &self,
        file: &DriveFile,
        row_limit: usize,
    ) -> Result<Dataset, DriveError> {
        let records = match file.mime_type.as_str() {
            GOOGLE_SHEET_MIME => {
                let mut url = self.url(&format!("files/{}/export", file.id))?;
                url.query_pairs_mut().append_pair("mimeType", "text/csv");
                let bytes = self.download(url).await?;
                parse_csv(&bytes)?
            }
            XLSX_MIME => {
                let mut url = self.url(&format!("files/{}", file.id))?;
                url.query_pairs_mut().append_pair("alt", "media");
                let bytes = self.download(url).await?;
                parse_xlsx(bytes)?
            }
            other => return Err(DriveError::UnsupportedMime(other.to_string())),
        };

        log::info!(
            "[drive] downloaded `{}` ({} records)",
            file.name,
            records.len()
        );
        let mut dataset = Dataset::from_records(file.name.clone(), records, row_limit);
        dataset.modified_at = file.modified_time.clone();
        Ok(dataset)
    }

    pub async fn fetch_dataset(
        &self,
        pattern: &str,
        row_limit: usize,
    ) -> Result<Dataset, DriveError> {
        let file = self.find_latest_spreadsheet(pattern).await?;
        self.download_dataset(&file, row_limit).await
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>, DriveError> {
        let bytes = self
            .authorised(self.http.get(url))
            .await?
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    async fn authorised(&self, builder: RequestBuilder) -> Result<RequestBuilder, DriveError> {
        Ok(match &self.auth {
            DriveAuth::Bearer(token) => builder.bearer_auth(token),
            DriveAuth::ServiceAccount(account) => {
                let token = account.token(&[DRIVE_READONLY_SCOPE]).await?;
                builder.bearer_auth(token.as_str())
            }
            DriveAuth::ApiKey(key) => builder.query(&[("key", key.as_str())]),
        })
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

fn search_query(pattern: &str) -> String {
    let mut query = format!(
        "(mimeType='{GOOGLE_SHEET_MIME}' or mimeType='{XLSX_MIME}') and trashed=false"
    );
    let pattern = pattern.trim();
    if !pattern.is_empty() {
        let escaped = pattern.replace('\\', "\\\\").replace('\'', "\\'");
        query.push_str(&format!(" and name contains '{escaped}'"));
    }
    query
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    reader
        .records()
        .map(|record| record.map(|r| r.iter().map(|cell| cell.trim().to_string()).collect()))
        .collect()
}

fn parse_xlsx(bytes: Vec<u8>) -> Result<Vec<Vec<String>>, DriveError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DriveError::EmptyWorkbook)??;
    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Dates as `YYYY-MM-DD`, or with the time when it is not midnight.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(dt) if !dt.is_duration() => match dt.as_datetime() {
            Some(at) => {
                let text = at.format("%Y-%m-%d %H:%M:%S").to_string();
                match text.strip_suffix(" 00:00:00") {
                    Some(date) => date.to_string(),
                    None => text,
                }
            }
            None => cell.to_string(),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    fn drive_settings() -> DriveSettings {
        DriveSettings {
            access_token: Some("test-token".into()),
            ..DriveSettings::default()
        }
    }

    fn client(server: &MockServer) -> DriveClient {
        DriveClient::with_base_url(
            &format!("{}/", server.base_url()),
            &drive_settings(),
            &NetworkSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn query_escapes_pattern() {
        let query = search_query("O'Brien quotes");
        assert!(query.contains("name contains 'O\\'Brien quotes'"));
        assert!(query.contains("trashed=false"));
        assert!(!search_query("  ").contains("name contains"));
    }

    #[test]
    fn requires_some_credentials() {
        assert!(matches!(
            DriveClient::new(&DriveSettings::default(), &NetworkSettings::default()),
            Err(DriveError::MissingCredentials)
        ));
    }

    #[test]
    fn csv_rows_are_trimmed_and_ragged_rows_allowed() {
        let rows = parse_csv(b"Customer,Volume\n Acme , 5\nGlobex\n").unwrap();
        assert_eq!(rows[1], vec!["Acme", "5"]);
        assert_eq!(rows[2], vec!["Globex"]);
    }

    #[test]
    fn garbage_is_not_a_workbook() {
        assert!(parse_xlsx(b"definitely not a zip".to_vec()).is_err());
    }

    fn orders_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let stamp_format = Format::new().set_num_format("yyyy-mm-dd hh:mm");
        sheet.write_string(0, 0, "Customer").unwrap();
        sheet.write_string(0, 1, "Ordered").unwrap();
        sheet.write_string(0, 2, "Volume").unwrap();
        sheet.write_string(1, 0, "Acme").unwrap();
        let ordered = ExcelDateTime::from_ymd(2026, 3, 15).unwrap();
        sheet.write_datetime_with_format(1, 1, &ordered, &date_format).unwrap();
        sheet.write_number(1, 2, 5.0).unwrap();
        sheet.write_string(2, 0, "Globex").unwrap();
        let stamped = ExcelDateTime::parse_from_str("2026-04-02 14:30:00").unwrap();
        sheet.write_datetime_with_format(2, 1, &stamped, &stamp_format).unwrap();
        sheet.write_number(2, 2, 12.0).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn workbook_dates_are_rendered_as_iso_text() {
        let rows = parse_xlsx(orders_workbook()).unwrap();
        assert_eq!(rows[0], vec!["Customer", "Ordered", "Volume"]);
        assert_eq!(rows[1], vec!["Acme", "2026-03-15", "5"]);
        assert_eq!(rows[2][1], "2026-04-02 14:30:00");
    }

    #[test]
    fn key_file_candidates_are_searched_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(find_key_file(&dirs), None);

        std::fs::write(second.path().join("client_secret.json"), "{}").unwrap();
        assert_eq!(
            find_key_file(&dirs),
            Some(second.path().join("client_secret.json"))
        );

        std::fs::write(second.path().join("boke_key.json"), "{}").unwrap();
        assert_eq!(find_key_file(&dirs), Some(second.path().join("boke_key.json")));

        std::fs::write(first.path().join("drive_key.json"), "{}").unwrap();
        assert_eq!(find_key_file(&dirs), Some(first.path().join("drive_key.json")));
    }

    #[test]
    fn unreadable_service_account_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drive_key.json");
        std::fs::write(&path, r#"{"type": "service_account"}"#).unwrap();
        let drive = DriveSettings {
            service_account_key: Some(path),
            ..DriveSettings::default()
        };
        assert!(matches!(
            DriveClient::new(&drive, &NetworkSettings::default()),
            Err(DriveError::ServiceAccount(_))
        ));
    }

    #[test]
    fn access_token_takes_precedence_over_key_file() {
        let drive = DriveSettings {
            access_token: Some("token".into()),
            service_account_key: Some(PathBuf::from("/nonexistent/drive_key.json")),
            api_key: Some("key".into()),
            ..DriveSettings::default()
        };
        assert!(matches!(
            DriveAuth::from_settings(&drive),
            Ok(DriveAuth::Bearer(token)) if token == "token"
        ));
    }

    #[tokio::test]
    async fn picks_newest_file_and_exports_csv() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/files")
                    .header("authorization", "Bearer test-token");
                then.status(200).json_body(serde_json::json!({
                    "files": [
                        {
                            "id": "old",
                            "name": "orders 2025",
                            "mimeType": GOOGLE_SHEET_MIME,
                            "modifiedTime": "2025-01-10T08:00:00.000Z"
                        },
                        {
                            "id": "new",
                            "name": "orders 2026",
                            "mimeType": GOOGLE_SHEET_MIME,
                            "modifiedTime": "2026-09-01T08:00:00.000Z"
                        }
                    ]
                }));
            })
            .await;
        let export = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/files/new/export")
                    .query_param("mimeType", "text/csv");
                then.status(200)
                    .body("Customer,Volume\nAcme,5\nGlobex,12\nInitech,30\n");
            })
            .await;

        let dataset = client(&server).fetch_dataset("orders", 2).await.unwrap();

        assert_eq!(dataset.source_name, "orders 2026");
        assert_eq!(dataset.headers, vec!["Customer", "Volume"]);
        assert_eq!(dataset.rows.len(), 2);
        assert_eq!(dataset.modified_at.as_deref(), Some("2026-09-01T08:00:00.000Z"));
        list.assert_async().await;
        export.assert_async().await;
    }

    #[tokio::test]
    async fn downloads_xlsx_media_with_dates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files");
                then.status(200).json_body(serde_json::json!({
                    "files": [{
                        "id": "book",
                        "name": "orders 2026.xlsx",
                        "mimeType": XLSX_MIME,
                        "modifiedTime": "2026-09-01T08:00:00Z"
                    }]
                }));
            })
            .await;
        let media = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/files/book")
                    .query_param("alt", "media")
                    .header("authorization", "Bearer test-token");
                then.status(200).body(orders_workbook());
            })
            .await;

        let dataset = client(&server).fetch_dataset("orders", 50).await.unwrap();

        assert_eq!(dataset.source_name, "orders 2026.xlsx");
        assert_eq!(dataset.headers, vec!["Customer", "Ordered", "Volume"]);
        assert_eq!(dataset.rows[0], vec!["Acme", "2026-03-15", "5"]);
        assert_eq!(dataset.rows.len(), 2);
        media.assert_async().await;
    }

    #[tokio::test]
    async fn api_key_is_sent_as_query_parameter() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/files").query_param("key", "shared-key");
                then.status(200).json_body(serde_json::json!({
                    "files": [{
                        "id": "sheet",
                        "name": "orders",
                        "mimeType": GOOGLE_SHEET_MIME
                    }]
                }));
            })
            .await;
        let export = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/files/sheet/export")
                    .query_param("key", "shared-key")
                    .query_param("mimeType", "text/csv");
                then.status(200).body("Customer\nAcme\n");
            })
            .await;

        let drive = DriveSettings {
            api_key: Some("shared-key".into()),
            ..DriveSettings::default()
        };
        let client = DriveClient::with_base_url(
            &format!("{}/", server.base_url()),
            &drive,
            &NetworkSettings::default(),
        )
        .unwrap();
        let dataset = client.fetch_dataset("orders", 50).await.unwrap();

        assert_eq!(dataset.rows, vec![vec!["Acme".to_string()]]);
        list.assert_async().await;
        export.assert_async().await;
    }

    #[tokio::test]
    async fn empty_listing_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files");
                then.status(200).json_body(serde_json::json!({ "files": [] }));
            })
            .await;

        assert!(matches!(
            client(&server).fetch_dataset("orders", 50).await,
            Err(DriveError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn auth_failure_surfaces_as_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files");
                then.status(401);
            })
            .await;

        assert!(matches!(
            client(&server).find_latest_spreadsheet("orders").await,
            Err(DriveError::Http(_))
        ));
    }

    #[tokio::test]
    async fn unsupported_mime_is_rejected() {
        let server = MockServer::start_async().await;
        let file = DriveFile {
            id: "pdf".into(),
            name: "drawing.pdf".into(),
            mime_type: "application/pdf".into(),
            modified_time: None,
        };
        assert!(matches!(
            client(&server).download_dataset(&file, 50).await,
            Err(DriveError::UnsupportedMime(_))
        ));
    }
}
