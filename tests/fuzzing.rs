//! Fuzzing suite for the pair engine
//!
//! Run with: cargo test --features fuzz
//! Increase cases: PROPTEST_CASES=1000 cargo test --features fuzz
//! Run deterministic only: cargo test --features fuzz fuzz_deterministic
//!
//! This suite implements:
//! - Snapshot-based "no mutation on error" checking
//! - Global invariants (claim conservation, locked minimum, custody covers reserves)
//! - Action-based state machine fuzzer
//! - Focused property tests for swaps and liquidity
//! - Deterministic seeded fuzzer with action history

#![cfg(feature = "fuzz")]

use duopool::*;
use proptest::prelude::*;

// ============================================================================
// SECTION 1: FIXTURE
// ============================================================================

const PAIR: Address = Address::new([0xAA; 32]);
const TOKEN_A: Address = Address::new([0x10; 32]);
const TOKEN_B: Address = Address::new([0x20; 32]);
const FEE_TO: Address = Address::new([0xFE; 32]);
const USERS: [Address; 3] = [
    Address::new([0x01; 32]),
    Address::new([0x02; 32]),
    Address::new([0x03; 32]),
];

const START: u64 = 1_700_000_000;
const FUNDING: u128 = 1_000_000_000_000_000_000_000_000; // 1e24 per user per asset

fn new_pair() -> (Pair, MemoryLedger) {
    let pair = Pair::new(PAIR, TOKEN_A, TOKEN_B, PairParams::default()).unwrap();
    let mut ledger = MemoryLedger::new();
    for user in USERS {
        ledger.issue(&TOKEN_A, &user, FUNDING).unwrap();
        ledger.issue(&TOKEN_B, &user, FUNDING).unwrap();
    }
    (pair, ledger)
}

// ============================================================================
// SECTION 2: SNAPSHOT TYPE FOR "NO MUTATION ON ERROR" CHECKING
// ============================================================================

/// Captures pair and ledger state for comparison
#[derive(Clone, Debug, PartialEq)]
struct Snapshot {
    reserves: Reserves,
    price0_cumulative: U256,
    price1_cumulative: U256,
    k_last: U256,
    claims: ClaimLedger,
    events: Vec<PairEvent>,
    ledger: MemoryLedger,
}

impl Snapshot {
    fn take(pair: &Pair, ledger: &MemoryLedger) -> Self {
        Snapshot {
            reserves: pair.reserves(),
            price0_cumulative: pair.price0_cumulative_last(),
            price1_cumulative: pair.price1_cumulative_last(),
            k_last: pair.k_last(),
            claims: pair.claims().clone(),
            events: pair.events().to_vec(),
            ledger: ledger.clone(),
        }
    }
}

fn assert_unchanged(pair: &Pair, ledger: &MemoryLedger, snapshot: &Snapshot, context: &str) {
    let now = Snapshot::take(pair, ledger);
    assert_eq!(now.reserves, snapshot.reserves, "{}: reserves changed on error", context);
    assert_eq!(now.price0_cumulative, snapshot.price0_cumulative, "{}: price0 changed on error", context);
    assert_eq!(now.price1_cumulative, snapshot.price1_cumulative, "{}: price1 changed on error", context);
    assert_eq!(now.k_last, snapshot.k_last, "{}: k_last changed on error", context);
    assert_eq!(now.claims, snapshot.claims, "{}: claims changed on error", context);
    assert_eq!(now.events, snapshot.events, "{}: events emitted on error", context);
    assert_eq!(now.ledger, snapshot.ledger, "{}: ledger changed on error", context);
    assert!(!pair.is_locked(), "{}: guard left held", context);
}

// ============================================================================
// SECTION 3: GLOBAL INVARIANTS
// ============================================================================

fn assert_global_invariants(pair: &Pair, ledger: &MemoryLedger, context: &str) {
    // Claim conservation
    let sum: u128 = pair.claims().holders().map(|(_, b)| *b).sum();
    assert_eq!(sum, pair.total_supply(), "{}: claim balances do not sum to supply", context);

    // Locked minimum
    if pair.total_supply() > 0 {
        assert!(pair.total_supply() >= MINIMUM_LIQUIDITY, "{}: supply below minimum", context);
        assert_eq!(
            pair.balance_of(&Address::ZERO),
            MINIMUM_LIQUIDITY,
            "{}: sink balance moved",
            context
        );
    }

    // Custody covers reserves, reserves fit 112 bits
    let reserves = pair.reserves();
    assert!(ledger.balance_of(&pair.token0(), &PAIR) >= reserves.reserve0, "{}: custody0 < reserve0", context);
    assert!(ledger.balance_of(&pair.token1(), &PAIR) >= reserves.reserve1, "{}: custody1 < reserve1", context);
    assert!(reserves.reserve0 <= MAX_RESERVE && reserves.reserve1 <= MAX_RESERVE, "{}: reserve too wide", context);

    // Once funded, never empty
    if pair.total_supply() > 0 {
        assert!(reserves.reserve0 > 0 && reserves.reserve1 > 0, "{}: funded pair with zero reserve", context);
    }

    // Assets are never created or destroyed by the pair
    let expected = FUNDING * USERS.len() as u128;
    assert_eq!(ledger.total_supply(&TOKEN_A), expected, "{}: token A not conserved", context);
    assert_eq!(ledger.total_supply(&TOKEN_B), expected, "{}: token B not conserved", context);

    assert!(!pair.is_locked(), "{}: guard left held", context);
}

// ============================================================================
// SECTION 4: ACTION GENERATION
// ============================================================================

#[derive(Clone, Debug)]
enum Action {
    AddLiquidity { user: usize, amount0: u128, amount1: u128 },
    RemoveLiquidity { user: usize, bps: u16 },
    Swap { user: usize, zero_for_one: bool, amount_in: u128, overshoot: u128 },
    Donate { user: usize, zero: bool, amount: u128 },
    TransferClaims { from: usize, to: usize, amount: u128 },
    Sync,
    Skim { user: usize },
    AdvanceTime { dt: u64 },
    ToggleFee,
}

fn amount_strategy() -> impl Strategy<Value = u128> {
    prop_oneof![
        0u128..=2_000,
        1_000u128..1_000_000_000,
        1_000_000_000u128..100_000_000_000_000_000_000,
    ]
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (0usize..3, amount_strategy(), amount_strategy())
            .prop_map(|(user, amount0, amount1)| Action::AddLiquidity { user, amount0, amount1 }),
        2 => (0usize..3, 0u16..=10_000).prop_map(|(user, bps)| Action::RemoveLiquidity { user, bps }),
        4 => (0usize..3, any::<bool>(), amount_strategy(), 0u128..3)
            .prop_map(|(user, zero_for_one, amount_in, overshoot)| Action::Swap { user, zero_for_one, amount_in, overshoot }),
        1 => (0usize..3, any::<bool>(), amount_strategy())
            .prop_map(|(user, zero, amount)| Action::Donate { user, zero, amount }),
        1 => (0usize..3, 0usize..3, amount_strategy())
            .prop_map(|(from, to, amount)| Action::TransferClaims { from, to, amount }),
        1 => Just(Action::Sync),
        1 => (0usize..3).prop_map(|user| Action::Skim { user }),
        2 => (0u64..10_000).prop_map(|dt| Action::AdvanceTime { dt }),
        1 => Just(Action::ToggleFee),
    ]
}

// ============================================================================
// SECTION 5: STATE MACHINE FUZZER
// ============================================================================

struct FuzzState {
    pair: Pair,
    ledger: MemoryLedger,
    fee_to: Option<Address>,
    now: u64,
}

impl FuzzState {
    fn new() -> Self {
        let (pair, ledger) = new_pair();
        FuzzState { pair, ledger, fee_to: None, now: START }
    }

    fn ctx(&self, user: usize) -> CallContext {
        CallContext::new(USERS[user], self.now)
    }

    /// Run `op`; on error require that nothing changed
    fn checked<T>(
        &mut self,
        context: &str,
        op: impl FnOnce(&mut Pair, &mut MemoryLedger) -> Result<T>,
    ) -> Option<T> {
        let snapshot = Snapshot::take(&self.pair, &self.ledger);
        match op(&mut self.pair, &mut self.ledger) {
            Ok(value) => Some(value),
            Err(_) => {
                assert_unchanged(&self.pair, &self.ledger, &snapshot, context);
                None
            }
        }
    }

    fn execute(&mut self, action: &Action, step: usize) {
        let context = format!("Step {} ({:?})", step, action);
        let (token0, token1) = (self.pair.token0(), self.pair.token1());

        match *action {
            Action::AddLiquidity { user, amount0, amount1 } => {
                self.ledger.transfer(&token0, &USERS[user], &PAIR, amount0).unwrap();
                self.ledger.transfer(&token1, &USERS[user], &PAIR, amount1).unwrap();
                let supply_before = self.pair.total_supply();
                let ctx = self.ctx(user);
                let fee_to = self.fee_to;
                if let Some(minted) = self.checked(&context, |pair, ledger| pair.mint(ledger, &fee_to, &ctx, USERS[user])) {
                    assert!(minted > 0, "{}: zero mint succeeded", context);
                    assert!(self.pair.total_supply() > supply_before, "{}: supply did not grow", context);
                }
            }

            Action::RemoveLiquidity { user, bps } => {
                let held = self.pair.balance_of(&USERS[user]);
                let amount = held * bps as u128 / 10_000;
                let ctx = self.ctx(user);
                if self.checked(&context, |pair, _| pair.transfer(&ctx, PAIR, amount)).is_none() {
                    return;
                }
                let fee_to = self.fee_to;
                let before = (self.ledger.balance_of(&token0, &USERS[user]), self.ledger.balance_of(&token1, &USERS[user]));
                if let Some((out0, out1)) = self.checked(&context, |pair, ledger| pair.burn(ledger, &fee_to, &ctx, USERS[user])) {
                    assert_eq!(self.ledger.balance_of(&token0, &USERS[user]), before.0 + out0, "{}: payout0", context);
                    assert_eq!(self.ledger.balance_of(&token1, &USERS[user]), before.1 + out1, "{}: payout1", context);
                    assert_eq!(self.pair.balance_of(&PAIR), 0, "{}: pair kept claims", context);
                } else {
                    // Give the claims back so they are not stranded
                    let pair_ctx = CallContext::new(PAIR, self.now);
                    let held = self.pair.balance_of(&PAIR);
                    self.pair.transfer(&pair_ctx, USERS[user], held).unwrap();
                }
            }

            Action::Swap { user, zero_for_one, amount_in, overshoot } => {
                let reserves = self.pair.reserves();
                let (asset_in, reserve_in, reserve_out) = if zero_for_one {
                    (token0, reserves.reserve0, reserves.reserve1)
                } else {
                    (token1, reserves.reserve1, reserves.reserve0)
                };
                let quoted = pair_math::get_amount_out(amount_in, reserve_in, reserve_out, FeeRate::DEFAULT).unwrap_or(0);
                let amount_out = quoted + overshoot;
                let (out0, out1) = if zero_for_one { (0, amount_out) } else { (amount_out, 0) };

                let surplus = self.ledger.balance_of(&token0, &PAIR) > reserves.reserve0
                    || self.ledger.balance_of(&token1, &PAIR) > reserves.reserve1;
                self.ledger.transfer(&asset_in, &USERS[user], &PAIR, amount_in).unwrap();
                let k_before = U256::from(reserves.reserve0) * U256::from(reserves.reserve1);
                let ctx = self.ctx(user);
                let result = self.checked(&context, |pair, ledger| {
                    pair.swap(ledger, &ctx, out0, out1, USERS[user], &[], &mut NoCallback)
                });

                if result.is_some() {
                    let after = self.pair.reserves();
                    let k_after = U256::from(after.reserve0) * U256::from(after.reserve1);
                    assert!(k_after >= k_before, "{}: k decreased", context);
                    // Without donated surplus the quote is the exact maximum
                    assert!(overshoot == 0 || surplus, "{}: over-quote accepted", context);
                } else {
                    // Input stays with the pair as surplus; hand it back
                    let user_ctx = self.ctx(user);
                    self.pair.skim(&mut self.ledger, &user_ctx, USERS[user]).unwrap();
                }
            }

            Action::Donate { user, zero, amount } => {
                let asset = if zero { token0 } else { token1 };
                self.ledger.transfer(&asset, &USERS[user], &PAIR, amount).unwrap();
            }

            Action::TransferClaims { from, to, amount } => {
                let ctx = self.ctx(from);
                let held = self.pair.balance_of(&USERS[from]);
                let result = self.checked(&context, |pair, _| pair.transfer(&ctx, USERS[to], amount));
                assert_eq!(result.is_some(), amount <= held, "{}: transfer outcome", context);
            }

            Action::Sync => {
                let ctx = self.ctx(0);
                self.checked(&context, |pair, ledger| pair.sync(ledger, &ctx));
            }

            Action::Skim { user } => {
                let ctx = self.ctx(user);
                self.checked(&context, |pair, ledger| pair.skim(ledger, &ctx, USERS[user]));
                let reserves = self.pair.reserves();
                assert_eq!(self.ledger.balance_of(&token0, &PAIR), reserves.reserve0, "{}: skim left surplus", context);
                assert_eq!(self.ledger.balance_of(&token1, &PAIR), reserves.reserve1, "{}: skim left surplus", context);
            }

            Action::AdvanceTime { dt } => {
                self.now += dt;
            }

            Action::ToggleFee => {
                self.fee_to = match self.fee_to {
                    Some(_) => None,
                    None => Some(FEE_TO),
                };
            }
        }

        assert_global_invariants(&self.pair, &self.ledger, &context);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn fuzz_state_machine(actions in prop::collection::vec(action_strategy(), 20..80)) {
        let mut state = FuzzState::new();
        for (step, action) in actions.iter().enumerate() {
            state.execute(action, step);
        }
    }
}

// ============================================================================
// SECTION 6: FOCUSED PROPERTY TESTS
// ============================================================================

fn funded(amount0: u128, amount1: u128) -> (Pair, MemoryLedger) {
    let (mut pair, mut ledger) = new_pair();
    let (token0, token1) = (pair.token0(), pair.token1());
    ledger.transfer(&token0, &USERS[0], &PAIR, amount0).unwrap();
    ledger.transfer(&token1, &USERS[0], &PAIR, amount1).unwrap();
    pair.mint(&mut ledger, &FeeOff, &CallContext::new(USERS[0], START), USERS[0]).unwrap();
    (pair, ledger)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The quoted output is accepted and one more unit is refused
    #[test]
    fn fuzz_prop_quote_is_tight(
        reserve0 in 10_000u128..1_000_000_000_000_000_000_000,
        reserve1 in 10_000u128..1_000_000_000_000_000_000_000,
        amount_in in 1_000u128..1_000_000_000_000_000_000_000,
    ) {
        let (mut pair, mut ledger) = funded(reserve0, reserve1);
        let token0 = pair.token0();
        let out = pair_math::get_amount_out(amount_in, reserve0, reserve1, FeeRate::DEFAULT).unwrap();
        prop_assume!(out > 0);
        ledger.transfer(&token0, &USERS[1], &PAIR, amount_in).unwrap();
        let ctx = CallContext::new(USERS[1], START);

        let too_much = pair.swap(&mut ledger, &ctx, 0, out + 1, USERS[1], &[], &mut NoCallback);
        prop_assert!(too_much.is_err());
        prop_assert!(pair.swap(&mut ledger, &ctx, 0, out, USERS[1], &[], &mut NoCallback).is_ok());
    }

    /// Minting then burning immediately never returns more than was put in
    #[test]
    fn fuzz_prop_round_trip_never_profits(
        reserve0 in 1_000_000u128..1_000_000_000_000_000_000,
        reserve1 in 1_000_000u128..1_000_000_000_000_000_000,
        deposit0 in 1u128..1_000_000_000_000_000_000,
        deposit1 in 1u128..1_000_000_000_000_000_000,
    ) {
        let (mut pair, mut ledger) = funded(reserve0, reserve1);
        let (token0, token1) = (pair.token0(), pair.token1());
        let user = USERS[2];
        let ctx = CallContext::new(user, START);
        ledger.transfer(&token0, &user, &PAIR, deposit0).unwrap();
        ledger.transfer(&token1, &user, &PAIR, deposit1).unwrap();

        if let Ok(minted) = pair.mint(&mut ledger, &FeeOff, &ctx, user) {
            pair.transfer(&ctx, PAIR, minted).unwrap();
            if let Ok((out0, out1)) = pair.burn(&mut ledger, &FeeOff, &ctx, user) {
                prop_assert!(out0 <= deposit0);
                prop_assert!(out1 <= deposit1);
            }
        }
    }

    /// Oracle accumulation is linear in elapsed time while reserves are fixed
    #[test]
    fn fuzz_prop_accumulator_linear(
        reserve0 in 1_000_000u128..1_000_000_000_000_000_000_000,
        reserve1 in 1_000_000u128..1_000_000_000_000_000_000_000,
        dt in 1u64..1_000_000,
    ) {
        let (mut pair, mut ledger) = funded(reserve0, reserve1);
        pair.sync(&mut ledger, &CallContext::new(USERS[0], START + dt)).unwrap();
        let once = pair.price0_cumulative_last();
        pair.sync(&mut ledger, &CallContext::new(USERS[0], START + 2 * dt)).unwrap();

        prop_assert_eq!(pair.price0_cumulative_last(), once * U256::from(2u8));
    }
}

// ============================================================================
// SECTION 7: DETERMINISTIC SEEDED FUZZER
// ============================================================================

/// xorshift64 PRNG for deterministic randomness
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Rng { state: if seed == 0 { 1 } else { seed } }
    }

    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn u128(&mut self, lo: u128, hi: u128) -> u128 {
        if lo >= hi { return lo; }
        let wide = ((self.next() as u128) << 64) | self.next() as u128;
        lo + wide % (hi - lo + 1)
    }

    fn usize(&mut self, lo: usize, hi: usize) -> usize {
        if lo >= hi { return lo; }
        lo + ((self.next() as usize) % (hi - lo + 1))
    }

    fn bool(&mut self) -> bool {
        self.next() % 2 == 0
    }
}

fn random_action(rng: &mut Rng) -> Action {
    let user = rng.usize(0, USERS.len() - 1);
    match rng.usize(0, 9) {
        0 | 1 => Action::AddLiquidity {
            user,
            amount0: rng.u128(0, 10u128.pow(21)),
            amount1: rng.u128(0, 10u128.pow(21)),
        },
        2 => Action::RemoveLiquidity { user, bps: rng.usize(0, 10_000) as u16 },
        3 | 4 | 5 => Action::Swap {
            user,
            zero_for_one: rng.bool(),
            amount_in: rng.u128(0, 10u128.pow(21)),
            overshoot: rng.u128(0, 2),
        },
        6 => Action::Donate { user, zero: rng.bool(), amount: rng.u128(0, 10u128.pow(18)) },
        7 => Action::Sync,
        8 => Action::AdvanceTime { dt: rng.u128(0, 100_000) as u64 },
        _ => Action::ToggleFee,
    }
}

fn run_deterministic_fuzzer(seeds: std::ops::Range<u64>, steps: usize) {
    for seed in seeds {
        let mut rng = Rng::new(seed);
        let mut state = FuzzState::new();
        let mut history: Vec<String> = Vec::with_capacity(10);

        for step in 0..steps {
            let action = random_action(&mut rng);
            if history.len() == 10 {
                history.remove(0);
            }
            history.push(format!("{:?}", action));

            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| state.execute(&action, step)));
            if outcome.is_err() {
                eprintln!("seed {} failed at step {}; last actions:", seed, step);
                for line in &history {
                    eprintln!("  {}", line);
                }
                panic!("deterministic fuzzer failed (seed {})", seed);
            }
        }
    }
}

#[test]
fn fuzz_deterministic() {
    run_deterministic_fuzzer(1..200, 200);
}
