//! Protection contract bindings and high-level operations.
//!
//! # Contracts
//! - `GitHubRepoProtection`: repository registry and violation reports
//! - `LinkRegistry`: URL → license / DMCA document pointers
//! - `InfringementBounty`: community infringement reports and rewards
//!
//! Reads go through `eth_call`; writes go through [`TxSubmitter`] and need a
//! signing key. Without one the contracts are read-only.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::{Log, TransactionRequest};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde::Serialize;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::fingerprint::similarity_to_int;
use crate::blockchain::network::wei_to_fil;
use crate::blockchain::transaction::TxSubmitter;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ContractCall, SubmissionConfig, SubmissionType, TxOutcome,
};
use crate::blockchain::wallet::Wallet;
use crate::config::ContractAddresses;

sol! {
    interface IGitHubRepoProtection {
        #[derive(Debug)]
        struct Repository {
            uint256 id;
            address owner;
            string githubUrl;
            string repoHash;
            string codeFingerprint;
            string[] keyFeatures;
            string licenseType;
            uint256 registeredAt;
            bool isActive;
            string ipfsMetadata;
        }

        /// Emitted when a repository is registered.
        #[derive(Debug)]
        event RepositoryRegistered(uint256 indexed repoId, address indexed owner, string githubUrl);

        /// Emitted when a violation is reported against a registered repository.
        #[derive(Debug)]
        event ViolationReported(uint256 indexed violationId, uint256 indexed originalRepoId, string violatingUrl, uint256 similarityScore);

        function processSubmission(
            uint8 submissionType,
            uint256 repoId,
            string githubUrl,
            string repoHash,
            string codeFingerprint,
            string[] keyFeatures,
            string licenseType,
            string ipfsMetadata,
            string evidenceHash,
            uint256 similarityScore
        ) external;

        function getRepository(uint256 repoId) external view returns (Repository memory);

        function getTotalRepositories() external view returns (uint256);
    }

    interface ILinkRegistry {
        function addLink(string url, string licenseCID) external;

        function fileDMCA(string url, string dmcaCID) external;

        function linkRecords(string url) external view returns (
            string recordUrl,
            string licenseCID,
            string dmcaCID,
            uint8 status,
            uint256 timestamp,
            bool exists
        );
    }

    interface IInfringementBounty {
        function reportInfringement(string url, string licenseCID, string dmcaCID) external;

        function rewards(address reporter) external view returns (uint256);

        function withdraw() external;
    }
}

/// Gas figures used for cost previews, not for submission.
const TYPICAL_GAS: &[(&str, u64)] = &[
    ("register_repository", 200_000),
    ("report_violation", 150_000),
    ("add_link", 100_000),
    ("file_dmca", 100_000),
    ("report_infringement", 120_000),
];

fn to_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Parsed contract addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContractAddressSet {
    pub github_protection: Address,
    pub link_registry: Address,
    pub infringement_bounty: Address,
}

impl ContractAddressSet {
    pub fn parse(addresses: &ContractAddresses) -> BlockchainResult<Self> {
        let parse = |name: &str, value: &str| {
            value
                .parse::<Address>()
                .map_err(|e| BlockchainError::Abi(format!("Invalid {} address '{}': {}", name, value, e)))
        };
        Ok(Self {
            github_protection: parse("github_protection", &addresses.github_protection)?,
            link_registry: parse("link_registry", &addresses.link_registry)?,
            infringement_bounty: parse("infringement_bounty", &addresses.infringement_bounty)?,
        })
    }

    pub fn named(&self) -> [(&'static str, Address); 3] {
        [
            ("github_protection", self.github_protection),
            ("link_registry", self.link_registry),
            ("infringement_bounty", self.infringement_bounty),
        ]
    }
}

/// Data submitted when registering a repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryRegistration {
    pub github_url: String,
    pub repo_hash: String,
    pub fingerprint: String,
    pub key_features: Vec<String>,
    pub license_type: String,
    /// CID of the license document.
    pub ipfs_metadata: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationReceipt {
    pub repo_id: u64,
    pub tx: TxOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolationReceipt {
    pub violation_id: Option<u64>,
    pub similarity_percent: u64,
    pub tx: TxOutcome,
}

/// A repository as stored by the protection contract.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OnChainRepository {
    pub id: u64,
    pub owner: Address,
    pub github_url: String,
    pub repo_hash: String,
    pub code_fingerprint: String,
    pub key_features: Vec<String>,
    pub license_type: String,
    pub registered_at: u64,
    pub is_active: bool,
    pub ipfs_metadata: String,
}

impl From<IGitHubRepoProtection::Repository> for OnChainRepository {
    fn from(repo: IGitHubRepoProtection::Repository) -> Self {
        Self {
            id: to_u64(repo.id),
            owner: repo.owner,
            github_url: repo.githubUrl,
            repo_hash: repo.repoHash,
            code_fingerprint: repo.codeFingerprint,
            key_features: repo.keyFeatures,
            license_type: repo.licenseType,
            registered_at: to_u64(repo.registeredAt),
            is_active: repo.isActive,
            ipfs_metadata: repo.ipfsMetadata,
        }
    }
}

/// A link registry entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LinkRecord {
    pub url: String,
    pub license_cid: String,
    pub dmca_cid: String,
    pub status: u8,
    pub timestamp: u64,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationCost {
    pub operation: String,
    pub gas_estimate: u64,
    pub cost_wei: u128,
    pub cost_fil: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostEstimate {
    pub gas_price_wei: u128,
    pub gas_price_gwei: f64,
    pub operations: Vec<OperationCost>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractCodeStatus {
    pub name: String,
    pub address: Address,
    pub deployed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Client for the three protection contracts.
pub struct ProtectionContracts {
    client: BlockchainClient,
    submitter: Option<TxSubmitter>,
    addresses: ContractAddressSet,
    submission: SubmissionConfig,
}

impl ProtectionContracts {
    pub fn new(
        client: BlockchainClient,
        wallet: Option<Wallet>,
        submission: SubmissionConfig,
    ) -> BlockchainResult<Self> {
        let addresses = ContractAddressSet::parse(&client.config().contracts)?;
        if wallet.is_none() {
            tracing::warn!("No signing key configured, contracts are read-only");
        }
        let submitter = wallet.map(|w| TxSubmitter::new(client.clone(), w, submission.clone()));
        Ok(Self {
            client,
            submitter,
            addresses,
            submission,
        })
    }

    pub fn client(&self) -> &BlockchainClient {
        &self.client
    }

    pub fn addresses(&self) -> &ContractAddressSet {
        &self.addresses
    }

    /// Address of the signing account, if any.
    pub fn account(&self) -> Option<Address> {
        self.submitter.as_ref().map(|s| s.wallet().address())
    }

    fn submitter(&self) -> BlockchainResult<&TxSubmitter> {
        self.submitter
            .as_ref()
            .ok_or_else(|| BlockchainError::NotAvailable("No private key configured".to_string()))
    }

    async fn send<C: SolCall>(
        &self,
        label: &'static str,
        to: Address,
        call: C,
        gas_buffer: u64,
    ) -> BlockchainResult<TxOutcome> {
        let submitter = self.submitter()?;
        submitter
            .submit(ContractCall {
                label,
                to,
                data: Bytes::from(call.abi_encode()),
                gas_buffer,
            })
            .await
    }

    async fn read<C: SolCall>(&self, to: Address, call: C) -> BlockchainResult<C::Return> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(Bytes::from(call.abi_encode()));
        let raw = self.client.call(tx).await?;
        C::abi_decode_returns(&raw).map_err(|e| BlockchainError::Abi(e.to_string()))
    }

    /// Register a repository. The id comes from the `RepositoryRegistered`
    /// log, or from the repository count when the node omits logs.
    pub async fn register_repository(
        &self,
        registration: &RepositoryRegistration,
    ) -> BlockchainResult<RegistrationReceipt> {
        let call = IGitHubRepoProtection::processSubmissionCall {
            submissionType: SubmissionType::Register.as_u8(),
            repoId: U256::ZERO,
            githubUrl: registration.github_url.clone(),
            repoHash: registration.repo_hash.clone(),
            codeFingerprint: registration.fingerprint.clone(),
            keyFeatures: registration.key_features.clone(),
            licenseType: registration.license_type.clone(),
            ipfsMetadata: registration.ipfs_metadata.clone(),
            evidenceHash: String::new(),
            similarityScore: U256::ZERO,
        };
        let tx = self
            .send(
                "register_repository",
                self.addresses.github_protection,
                call,
                self.submission.register_gas_buffer,
            )
            .await?;

        let repo_id = match repo_id_from_logs(&tx.logs, self.addresses.github_protection) {
            Some(id) => id,
            None => {
                tracing::warn!(tx_hash = %tx.tx_hash, "No RepositoryRegistered log, using repository count");
                self.total_repositories().await?
            }
        };

        tracing::info!(repo_id, github_url = %registration.github_url, "Repository registered");
        Ok(RegistrationReceipt { repo_id, tx })
    }

    /// Report a violation against a registered repository.
    pub async fn report_violation(
        &self,
        original_repo_id: u64,
        violating_url: &str,
        evidence_hash: &str,
        similarity: f64,
    ) -> BlockchainResult<ViolationReceipt> {
        let similarity_percent = similarity_to_int(similarity);
        let call = IGitHubRepoProtection::processSubmissionCall {
            submissionType: SubmissionType::ReportViolation.as_u8(),
            repoId: U256::from(original_repo_id),
            githubUrl: violating_url.to_string(),
            repoHash: String::new(),
            codeFingerprint: String::new(),
            keyFeatures: Vec::new(),
            licenseType: String::new(),
            ipfsMetadata: String::new(),
            evidenceHash: evidence_hash.to_string(),
            similarityScore: U256::from(similarity_percent),
        };
        let tx = self
            .send(
                "report_violation",
                self.addresses.github_protection,
                call,
                self.submission.register_gas_buffer,
            )
            .await?;

        let violation_id = violation_id_from_logs(&tx.logs, self.addresses.github_protection);
        Ok(ViolationReceipt {
            violation_id,
            similarity_percent,
            tx,
        })
    }

    pub async fn add_link(&self, url: &str, license_cid: &str) -> BlockchainResult<TxOutcome> {
        let call = ILinkRegistry::addLinkCall {
            url: url.to_string(),
            licenseCID: license_cid.to_string(),
        };
        self.send("add_link", self.addresses.link_registry, call, self.submission.link_gas_buffer)
            .await
    }

    pub async fn file_dmca(&self, url: &str, dmca_cid: &str) -> BlockchainResult<TxOutcome> {
        let call = ILinkRegistry::fileDMCACall {
            url: url.to_string(),
            dmcaCID: dmca_cid.to_string(),
        };
        self.send("file_dmca", self.addresses.link_registry, call, self.submission.link_gas_buffer)
            .await
    }

    pub async fn report_infringement(
        &self,
        url: &str,
        license_cid: &str,
        dmca_cid: &str,
    ) -> BlockchainResult<TxOutcome> {
        let call = IInfringementBounty::reportInfringementCall {
            url: url.to_string(),
            licenseCID: license_cid.to_string(),
            dmcaCID: dmca_cid.to_string(),
        };
        self.send(
            "report_infringement",
            self.addresses.infringement_bounty,
            call,
            self.submission.link_gas_buffer,
        )
        .await
    }

    pub async fn withdraw_bounty(&self) -> BlockchainResult<TxOutcome> {
        self.send(
            "withdraw_bounty",
            self.addresses.infringement_bounty,
            IInfringementBounty::withdrawCall {},
            self.submission.link_gas_buffer,
        )
        .await
    }

    pub async fn get_repository(&self, repo_id: u64) -> BlockchainResult<OnChainRepository> {
        let call = IGitHubRepoProtection::getRepositoryCall {
            repoId: U256::from(repo_id),
        };
        let repo = self.read(self.addresses.github_protection, call).await?;
        Ok(repo.into())
    }

    pub async fn total_repositories(&self) -> BlockchainResult<u64> {
        let total = self
            .read(
                self.addresses.github_protection,
                IGitHubRepoProtection::getTotalRepositoriesCall {},
            )
            .await?;
        Ok(to_u64(total))
    }

    pub async fn link_record(&self, url: &str) -> BlockchainResult<LinkRecord> {
        let call = ILinkRegistry::linkRecordsCall { url: url.to_string() };
        let record = self.read(self.addresses.link_registry, call).await?;
        Ok(LinkRecord {
            url: record.recordUrl,
            license_cid: record.licenseCID,
            dmca_cid: record.dmcaCID,
            status: record.status,
            timestamp: to_u64(record.timestamp),
            exists: record.exists,
        })
    }

    /// Unclaimed bounty of `reporter`, in wei.
    pub async fn bounty_rewards(&self, reporter: Address) -> BlockchainResult<U256> {
        let call = IInfringementBounty::rewardsCall { reporter };
        self.read(self.addresses.infringement_bounty, call).await
    }

    /// Native balance of the signing account, in wei.
    pub async fn account_balance(&self) -> BlockchainResult<U256> {
        let account = self
            .account()
            .ok_or_else(|| BlockchainError::NotAvailable("No private key configured".to_string()))?;
        self.client.get_balance(account).await
    }

    /// Cost preview for the common operations at the current gas price.
    pub async fn estimate_operation_costs(&self) -> BlockchainResult<CostEstimate> {
        let gas_price = self.client.get_gas_price().await?;
        let operations = TYPICAL_GAS
            .iter()
            .map(|(operation, gas)| {
                let cost_wei = gas_price.saturating_mul(*gas as u128);
                OperationCost {
                    operation: operation.to_string(),
                    gas_estimate: *gas,
                    cost_wei,
                    cost_fil: wei_to_fil(U256::from(cost_wei)),
                }
            })
            .collect();

        Ok(CostEstimate {
            gas_price_wei: gas_price,
            gas_price_gwei: gas_price as f64 / 1e9,
            operations,
        })
    }

    /// Whether each configured contract address has bytecode.
    pub async fn check_contract_code(&self) -> Vec<ContractCodeStatus> {
        let mut statuses = Vec::new();
        for (name, address) in self.addresses.named() {
            let status = match self.client.get_code(address).await {
                Ok(code) => ContractCodeStatus {
                    name: name.to_string(),
                    address,
                    deployed: !code.is_empty(),
                    error: code.is_empty().then(|| "No bytecode".to_string()),
                },
                Err(e) => ContractCodeStatus {
                    name: name.to_string(),
                    address,
                    deployed: false,
                    error: Some(e.to_string()),
                },
            };
            statuses.push(status);
        }
        statuses
    }
}

/// Repository id from the first `RepositoryRegistered` log emitted by `contract`.
pub fn repo_id_from_logs(logs: &[Log], contract: Address) -> Option<u64> {
    logs.iter()
        .filter(|log| log.address() == contract)
        .find_map(|log| log.log_decode::<IGitHubRepoProtection::RepositoryRegistered>().ok())
        .map(|decoded| to_u64(decoded.inner.data.repoId))
}

/// Violation id from the first `ViolationReported` log emitted by `contract`.
pub fn violation_id_from_logs(logs: &[Log], contract: Address) -> Option<u64> {
    logs.iter()
        .filter(|log| log.address() == contract)
        .find_map(|log| log.log_decode::<IGitHubRepoProtection::ViolationReported>().ok())
        .map(|decoded| to_u64(decoded.inner.data.violationId))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolEvent;

    fn contract() -> Address {
        "0x19054030669efBFc413bA3729b63eCfD3Bdc22B5".parse().unwrap()
    }

    fn rpc_log(address: Address, data: alloy::primitives::LogData) -> Log {
        Log {
            inner: alloy::primitives::Log { address, data },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_addresses_parse() {
        let set = ContractAddressSet::parse(&ContractAddresses::default()).unwrap();
        assert_eq!(set.github_protection, contract());
    }

    #[test]
    fn test_invalid_address_rejected() {
        let addresses = ContractAddresses {
            link_registry: "0xnope".to_string(),
            ..ContractAddresses::default()
        };
        let err = ContractAddressSet::parse(&addresses).unwrap_err();
        assert!(err.to_string().contains("link_registry"));
    }

    #[test]
    fn test_repo_id_from_registered_log() {
        let event = IGitHubRepoProtection::RepositoryRegistered {
            repoId: U256::from(42),
            owner: Address::ZERO,
            githubUrl: "https://github.com/acme/widget".to_string(),
        };
        let logs = vec![rpc_log(contract(), event.encode_log_data())];
        assert_eq!(repo_id_from_logs(&logs, contract()), Some(42));
    }

    #[test]
    fn test_logs_from_other_contracts_ignored() {
        let event = IGitHubRepoProtection::RepositoryRegistered {
            repoId: U256::from(42),
            owner: Address::ZERO,
            githubUrl: String::new(),
        };
        let logs = vec![rpc_log(Address::ZERO, event.encode_log_data())];
        assert_eq!(repo_id_from_logs(&logs, contract()), None);
    }

    #[test]
    fn test_violation_id_from_log() {
        let event = IGitHubRepoProtection::ViolationReported {
            violationId: U256::from(3),
            originalRepoId: U256::from(42),
            violatingUrl: "https://github.com/copy/widget".to_string(),
            similarityScore: U256::from(91),
        };
        let logs = vec![rpc_log(contract(), event.encode_log_data())];
        assert_eq!(violation_id_from_logs(&logs, contract()), Some(3));
        assert_eq!(repo_id_from_logs(&logs, contract()), None);
    }

    #[test]
    fn test_process_submission_encoding() {
        let call = IGitHubRepoProtection::processSubmissionCall {
            submissionType: SubmissionType::Register.as_u8(),
            repoId: U256::ZERO,
            githubUrl: "https://github.com/acme/widget".to_string(),
            repoHash: "h".to_string(),
            codeFingerprint: "f".to_string(),
            keyFeatures: vec!["a".to_string()],
            licenseType: "MIT".to_string(),
            ipfsMetadata: "bafy".to_string(),
            evidenceHash: String::new(),
            similarityScore: U256::ZERO,
        };
        let encoded = call.abi_encode();
        assert_eq!(&encoded[..4], IGitHubRepoProtection::processSubmissionCall::SELECTOR.as_slice());
    }

    #[test]
    fn test_total_repositories_decoding() {
        let raw = U256::from(12).to_be_bytes::<32>();
        let total =
            IGitHubRepoProtection::getTotalRepositoriesCall::abi_decode_returns(&raw).unwrap();
        assert_eq!(to_u64(total), 12);
    }
}
