//! Centralized Contract Definitions
//!
//! Solidity interfaces used by the searcher, defined with alloy's `sol!` macro.
//! Each interface is annotated with `#[sol(rpc)]` to generate contract
//! instance types that can make RPC calls via any alloy Provider.
//!
//! Created: 2026-10-18

use alloy::sol;

// ── ERC20 ─────────────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

// ── Uniswap V2 ───────────────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
        function swap(uint256 amount0Out, uint256 amount1Out, address to, bytes calldata data) external;
    }
}

// ── BundleExecutor (custom atomic arb contract) ─────────────────────
//
// Transfers `wethAmountToFirstMarket` to targets[0], runs every
// (target, payload) call in order, checks the WETH balance grew, and pays
// `ethAmountToCoinbase` to block.coinbase.

sol! {
    #[sol(rpc)]
    interface IBundleExecutor {
        function uniswapWeth(uint256 wethAmountToFirstMarket, uint256 ethAmountToCoinbase, address[] memory targets, bytes[] memory payloads) external payable;
    }
}
