//! Mantle contract bindings.
//!
//! Covers the four contracts the monitor talks to:
//! - L2CrossDomainMessenger (L2 predeploy, message events)
//! - L2ToL1MessagePasser (L2 predeploy, withdrawal registry)
//! - L2OutputOracle (L1 contract, proposed output roots)
//! - OptimismPortal (L1 contract, prove + finalize)

use alloy_sol_types::sol;

sol! {
    /// L2CrossDomainMessenger - L2 predeploy emitting the message-level events
    /// Address: 0x4200000000000000000000000000000000000007
    #[sol(rpc)]
    interface IL2CrossDomainMessenger {
        /// Emitted for every cross-domain message sent from L2
        #[derive(Debug)]
        event SentMessage(
            address indexed target,
            address sender,
            bytes message,
            uint256 messageNonce,
            uint256 gasLimit
        );

        /// Emitted alongside SentMessage when the message carries value
        #[derive(Debug)]
        event SentMessageExtension1(
            address indexed sender,
            uint256 mntValue,
            uint256 ethValue
        );
    }

    /// L2ToL1MessagePasser - L2 predeploy recording outgoing withdrawals
    /// Address: 0x4200000000000000000000000000000000000016
    #[sol(rpc)]
    interface IL2ToL1MessagePasser {
        /// Emitted when a withdrawal is initiated on L2
        #[derive(Debug)]
        event MessagePassed(
            uint256 indexed nonce,
            address indexed sender,
            address indexed target,
            uint256 value,
            uint256 gasLimit,
            bytes data,
            bytes32 withdrawalHash
        );

        /// Check if a withdrawal message has been registered
        function sentMessages(bytes32) external view returns (bool);

        /// Get the current message nonce (version encoded in the top 2 bytes)
        function messageNonce() external view returns (uint256);
    }

    /// L2OutputOracle - L1 contract holding the proposed L2 output roots
    #[sol(rpc)]
    interface IL2OutputOracle {
        /// One proposed output root and the L2 block it commits to
        #[derive(Debug)]
        struct OutputProposal {
            bytes32 outputRoot;
            uint128 timestamp;
            uint128 l2BlockNumber;
        }

        /// Index of the first output whose L2 block number is >= the argument
        function getL2OutputIndexAfter(uint256 _l2BlockNumber)
            external view returns (uint256);

        /// Fetch a proposed output by index
        function getL2Output(uint256 _l2OutputIndex)
            external view returns (OutputProposal memory);

        /// Highest L2 block number with a proposed output
        function latestBlockNumber() external view returns (uint256);
    }

    /// OptimismPortal - L1 contract verifying withdrawal proofs and releasing funds
    #[sol(rpc)]
    interface IOptimismPortal {
        /// Proven withdrawal record stored on L1; the middle word is unused here
        #[derive(Debug)]
        struct ProvenWithdrawal {
            bytes32 outputRoot;
            bytes32 l2OutputIndex;
            uint128 timestamp;
        }

        /// Emitted when a withdrawal is proven on L1
        #[derive(Debug)]
        event WithdrawalProven(
            bytes32 indexed withdrawalHash,
            address indexed from,
            address indexed to
        );

        /// Emitted when a withdrawal is finalized on L1
        #[derive(Debug)]
        event WithdrawalFinalized(
            bytes32 indexed withdrawalHash,
            bool success
        );

        /// Query the proven withdrawal record by hash
        function provenWithdrawals(bytes32 withdrawalHash)
            external view returns (ProvenWithdrawal memory);

        /// Query if a withdrawal has been finalized
        function finalizedWithdrawals(bytes32 withdrawalHash)
            external view returns (bool);

        /// Prove a withdrawal transaction against a proposed output root
        function proveWithdrawalTransaction(
            WithdrawalTransaction calldata _tx,
            uint256 _l2OutputIndex,
            OutputRootProof calldata _outputRootProof,
            bytes[] calldata _withdrawalProof
        ) external;

        /// Finalize a proven withdrawal once the challenge period has passed
        function finalizeWithdrawalTransaction(
            WithdrawalTransaction calldata _tx
        ) external;
    }

    /// Output root proof structure (used in proving withdrawals)
    #[derive(Debug)]
    struct OutputRootProof {
        bytes32 version;
        bytes32 stateRoot;
        bytes32 messagePasserStorageRoot;
        bytes32 latestBlockhash;
    }

    /// Withdrawal transaction structure (shared across prove and finalize)
    #[derive(Debug)]
    struct WithdrawalTransaction {
        uint256 nonce;
        address sender;
        address target;
        uint256 mntValue;
        uint256 ethValue;
        uint256 gasLimit;
        bytes data;
    }
}
