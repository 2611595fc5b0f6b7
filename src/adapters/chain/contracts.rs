//! Contract ABIs used by the reserve.
//!
//! Only call encoding/decoding is generated; transactions are built and
//! sent through the shared provider.

use alloy::sol;

sol! {
    /// Minimal ERC-20 surface for balance reads.
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
    }

    /// Reserve contract holding the inventory.
    interface IReserve {
        function withdraw(address token, uint256 amount, address destination) external returns (bool);
    }

    /// Pricing contract that serves on-chain conversion rates.
    interface IConversionRates {
        function setRate(
            address[] sources,
            address[] dests,
            uint256[] conversionRates,
            uint256[] expiryBlocks,
            bool validate
        ) external returns (bool);
    }
}
