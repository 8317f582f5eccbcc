use std::time::Duration;

use serde::de::DeserializeOwned;
use log::*;

use super::records::RpcResponse;
use super::{BasicPackageInfo, PackageRecord, Registry, RegistryError, SearchField};

/// Client for the AUR RPC v5 interface.
#[derive(Debug, Clone)]
pub struct RpcClient {
	client: reqwest::Client,
	base_url: reqwest::Url,
}

impl RpcClient {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
		let base_url = reqwest::Url::parse(base_url).map_err(|e| RegistryError::InvalidUrl(format!("{}: {}", base_url, e)))?;
		if base_url.cannot_be_a_base() {
			return Err(RegistryError::InvalidUrl(base_url.to_string()));
		}
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.user_agent(concat!("aur-rs/", env!("CARGO_PKG_VERSION")))
			.build()?;
		Ok(Self { client, base_url })
	}

	pub fn from_config(config: &crate::AurRsConfig) -> Result<Self, RegistryError> {
		Self::new(config.registry_url(), config.request_timeout())
	}

	pub fn base_url(&self) -> &str {
		self.base_url.as_str()
	}

	/// Appends percent-encoded path segments to the base url.
	fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
		let mut url = self.base_url.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	async fn get(&self, url: reqwest::Url, query: &[(&str, &str)]) -> Result<Vec<u8>, RegistryError> {
		debug!("GET {} {:?}", url, query);
		let response = self.client.get(url).query(query).send().await?;
		let status = response.status();
		if !status.is_success() {
			warn!("Registry responded with {}", status);
			return Err(RegistryError::Status(status.as_u16()));
		}
		Ok(response.bytes().await?.to_vec())
	}
}

/// Unwraps an RPC envelope, turning error responses into [`RegistryError::Rpc`].
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>, RegistryError> {
	let response: RpcResponse<T> = serde_json::from_slice(body)?;
	if response.kind == "error" {
		return Err(RegistryError::Rpc(response.error.unwrap_or_else(|| "unknown error".to_string())));
	}
	trace!("Registry returned {} results", response.resultcount);
	Ok(response.results)
}

#[async_trait::async_trait]
impl Registry for RpcClient {
	async fn search(&self, term: &str, field: SearchField) -> Result<Vec<BasicPackageInfo>, RegistryError> {
		let body = self.get(self.endpoint(&["search", term]), &[("by", field.as_str())]).await?;
		decode(&body)
	}

	async fn info_many(&self, names: &[String]) -> Result<Vec<PackageRecord>, RegistryError> {
		if names.is_empty() {
			return Ok(Vec::new());
		}
		let query = names.iter().map(|n| ("arg[]", n.as_str())).collect::<Vec<_>>();
		let body = self.get(self.endpoint(&["info"]), &query).await?;
		decode(&body)
	}

	async fn info(&self, name: &str) -> Result<Option<PackageRecord>, RegistryError> {
		let body = self.get(self.endpoint(&["info", name]), &[]).await?;
		let records: Vec<PackageRecord> = decode(&body)?;
		Ok(records.into_iter().find(|r| r.name == name))
	}

	async fn suggest(&self, prefix: &str) -> Result<Vec<String>, RegistryError> {
		let body = self.get(self.endpoint(&["suggest", prefix]), &[]).await?;
		Ok(serde_json::from_slice(&body)?)
	}

	async fn suggest_pkgbase(&self, prefix: &str) -> Result<Vec<String>, RegistryError> {
		let body = self.get(self.endpoint(&["suggest-pkgbase", prefix]), &[]).await?;
		Ok(serde_json::from_slice(&body)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn client() -> RpcClient {
		RpcClient::new(crate::config::DEFAULT_REGISTRY_URL, Duration::from_secs(5)).unwrap()
	}

	#[test]
	fn endpoint_keeps_version_prefix() {
		assert_eq!(client().endpoint(&["info", "iup"]).as_str(), "https://aur.archlinux.org/rpc/v5/info/iup");
	}

	#[test]
	fn endpoint_encodes_segments() {
		assert_eq!(client().endpoint(&["search", "a b/c"]).as_str(), "https://aur.archlinux.org/rpc/v5/search/a%20b%2Fc");
	}

	#[test]
	fn invalid_base_url() {
		assert!(matches!(RpcClient::new("not a url", Duration::from_secs(1)), Err(RegistryError::InvalidUrl(_))));
	}

	#[test]
	fn decode_results() {
		let body = br#"{"resultcount":1,"type":"multiinfo","version":5,"results":[{"Name":"iup","PackageBase":"iup","Version":"3.30-1","Depends":["libcd"]}]}"#;
		let records: Vec<PackageRecord> = decode(body).unwrap();
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].depends, vec!["libcd"]);
	}

	#[test]
	fn decode_error_body() {
		let body = br#"{"resultcount":0,"results":[],"type":"error","version":5,"error":"Query arg too small."}"#;
		let res: Result<Vec<BasicPackageInfo>, _> = decode(body);
		assert!(matches!(res, Err(RegistryError::Rpc(msg)) if msg == "Query arg too small."));
	}
}
