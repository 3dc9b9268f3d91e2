//! Contract bindings for the tokens, pool and Stake DAO contracts the workflows touch
//!
//! Only the functions actually called are declared. The generated `*Call` structs
//! are used for calldata encoding so transactions can be built without a provider.

use ethers::contract::abigen;

abigen!(
    Erc20,
    r#"[
        function balanceOf(address owner) external view returns (uint256)
        function allowance(address owner, address spender) external view returns (uint256)
        function approve(address spender, uint256 amount) external returns (bool)
    ]"#,
);

abigen!(
    CurveTricryptoPool,
    r#"[
        function calc_token_amount(uint256[3] amounts, bool deposit) external view returns (uint256)
        function add_liquidity(uint256[3] amounts, uint256 min_mint_amount, bool use_eth) external returns (uint256)
    ]"#,
);

abigen!(
    StakeDaoVault,
    r#"[
        function deposit(uint256 assets, address receiver) external returns (uint256)
    ]"#,
);

abigen!(
    StakeDaoHarvester,
    r#"[
        function claim(address[] gauges, bytes[] harvest_data) external
    ]"#,
);
