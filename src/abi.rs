//! Contract interfaces for the fixed set of protocol contract roles.
//!
//! Interfaces are declared inline: every role (token, pair, factory,
//! router, voter, gauge, bribe, vote escrow, distributor) has a small
//! stable ABI surface and no deployable artifacts are required.

#[allow(clippy::too_many_arguments)]
pub mod erc20 {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract Erc20 {
            function name() external view returns (string);
            function symbol() external view returns (string);
            function decimals() external view returns (uint8);
            function totalSupply() external view returns (uint256);
            function balanceOf(address owner) external view returns (uint256);
            function allowance(address owner, address spender) external view returns (uint256);
            function approve(address spender, uint256 amount) external returns (bool);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod wrapped_native {
    alloy::sol!(
        /// Canonical wrapped-native token. `deposit` wraps the attached
        /// call value, `withdraw` unwraps back to the native currency.
        #[derive(Debug)]
        #[sol(rpc)]
        contract WrappedNative {
            function deposit() external payable;
            function withdraw(uint256 amount) external;
            function balanceOf(address owner) external view returns (uint256);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod pair {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract Pair {
            function token0() external view returns (address);
            function token1() external view returns (address);
            function stable() external view returns (bool);
            function symbol() external view returns (string);
            function decimals() external view returns (uint8);
            function totalSupply() external view returns (uint256);
            function balanceOf(address owner) external view returns (uint256);
            function allowance(address owner, address spender) external view returns (uint256);
            function approve(address spender, uint256 amount) external returns (bool);
            function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint256 blockTimestampLast);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod factory {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract PairFactory {
            function getPair(address tokenA, address tokenB, bool stable) external view returns (address);
            function isPair(address pair) external view returns (bool);
            function allPairsLength() external view returns (uint256);
            function allPairs(uint256 index) external view returns (address);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod router {
    alloy::sol!(
        /// Solidly-style router. Swap and liquidity entrypoints take a
        /// deadline timestamp and slippage-adjusted minimum amounts; the
        /// `...ETH` variants take the native amount as call value.
        #[derive(Debug)]
        #[sol(rpc)]
        contract Router {
            struct Route {
                address from;
                address to;
                bool stable;
            }

            function getAmountsOut(uint256 amountIn, Route[] memory routes) external view returns (uint256[] memory amounts);
            function getReserves(address tokenA, address tokenB, bool stable) external view returns (uint256 reserveA, uint256 reserveB);
            function pairFor(address tokenA, address tokenB, bool stable) external view returns (address pair);

            function quoteAddLiquidity(address tokenA, address tokenB, bool stable, uint256 amountADesired, uint256 amountBDesired) external view returns (uint256 amountA, uint256 amountB, uint256 liquidity);
            function quoteRemoveLiquidity(address tokenA, address tokenB, bool stable, uint256 liquidity) external view returns (uint256 amountA, uint256 amountB);

            function addLiquidity(address tokenA, address tokenB, bool stable, uint256 amountADesired, uint256 amountBDesired, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
            function addLiquidityETH(address token, bool stable, uint256 amountTokenDesired, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline) external payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity);
            function removeLiquidity(address tokenA, address tokenB, bool stable, uint256 liquidity, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) external returns (uint256 amountA, uint256 amountB);
            function removeLiquidityETH(address token, bool stable, uint256 liquidity, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline) external returns (uint256 amountToken, uint256 amountETH);

            function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, Route[] calldata routes, address to, uint256 deadline) external returns (uint256[] memory amounts);
            function swapExactETHForTokens(uint256 amountOutMin, Route[] calldata routes, address to, uint256 deadline) external payable returns (uint256[] memory amounts);
            function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, Route[] calldata routes, address to, uint256 deadline) external returns (uint256[] memory amounts);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod voter {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract Voter {
            function gauges(address pair) external view returns (address);
            function bribes(address gauge) external view returns (address);
            function createGauge(address pair) external returns (address);
            function vote(uint256 tokenId, address[] calldata poolVote, int256[] calldata weights) external;
            function votes(uint256 tokenId, address pair) external view returns (int256);
            function weights(address pair) external view returns (int256);
            function totalWeight() external view returns (int256);
            function usedWeights(uint256 tokenId) external view returns (uint256);
            function isWhitelisted(address token) external view returns (bool);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod gauge {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract Gauge {
            function balanceOf(address owner) external view returns (uint256);
            function totalSupply() external view returns (uint256);
            function rewardRate(address token) external view returns (uint256);
            function earned(address token, address owner) external view returns (uint256);
            function deposit(uint256 amount, uint256 tokenId) external;
            function withdraw(uint256 amount) external;
            function getReward(address owner, address[] calldata tokens) external;
            function rewardsListLength() external view returns (uint256);
            function rewards(uint256 index) external view returns (address);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod bribe {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract Bribe {
            function rewardsListLength() external view returns (uint256);
            function rewards(uint256 index) external view returns (address);
            function rewardRate(address token) external view returns (uint256);
            function earned(address token, uint256 tokenId) external view returns (uint256);
            function getRewardForOwner(uint256 tokenId, address[] calldata tokens) external;
            function notifyRewardAmount(address token, uint256 amount) external;
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod voting_escrow {
    alloy::sol!(
        #[derive(Debug)]
        #[sol(rpc)]
        contract VotingEscrow {
            struct LockedBalance {
                int128 amount;
                uint256 end;
            }

            function create_lock(uint256 value, uint256 lockDuration) external returns (uint256);
            function increase_amount(uint256 tokenId, uint256 value) external;
            function increase_unlock_time(uint256 tokenId, uint256 lockDuration) external;
            function withdraw(uint256 tokenId) external;
            function locked(uint256 tokenId) external view returns (LockedBalance memory);
            function balanceOfNFT(uint256 tokenId) external view returns (uint256);
            function balanceOf(address owner) external view returns (uint256);
            function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
            function totalSupply() external view returns (uint256);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod distributor {
    alloy::sol!(
        /// Rebase distributor for vote-escrow positions.
        #[derive(Debug)]
        #[sol(rpc)]
        contract Distributor {
            function claimable(uint256 tokenId) external view returns (uint256);
            function claim(uint256 tokenId) external returns (uint256);
        }
    );
}

#[allow(clippy::too_many_arguments)]
pub mod redeemer {
    alloy::sol!(
        /// Legacy governance token redemption, v1 -> v2, one way.
        #[derive(Debug)]
        #[sol(rpc)]
        contract Redeemer {
            function redeem(uint256 amount) external;
        }
    );
}
