use std::time::Duration;

use spell_arena_core::{CastError, SpellId, Timestamp};
use spell_arena_system_spellcasting::SpellBook;
use spell_arena_world::player::ShieldEffect;

#[test]
fn cooldown_gates_repeat_casts_until_it_elapses() {
    let mut book = SpellBook::new();
    let mut shield = ShieldEffect::default();
    assert!(book.select_spell(1));
    let mut mana = 20.0_f32;

    let first = book
        .cast_current_spell(mana, Timestamp::ZERO, &mut shield)
        .expect("first cast succeeds");
    mana -= first.mana_cost;
    assert_eq!(mana, 15.0);

    match book.cast_current_spell(mana, Timestamp::from_millis(10), &mut shield) {
        Err(CastError::OnCooldown {
            spell,
            remaining_secs,
        }) => {
            assert_eq!(spell, SpellId::Expelliarmus);
            assert!((remaining_secs - 1.99).abs() < 1e-4);
        }
        other => panic!("expected a cooldown failure, got {other:?}"),
    }

    assert!(book
        .cast_current_spell(mana, Timestamp::from_millis(1_999), &mut shield)
        .is_err());
    assert!(book
        .cast_current_spell(mana, Timestamp::from_millis(2_000), &mut shield)
        .is_ok());
}

#[test]
fn ten_mana_stun_leaves_ten_and_waits_out_its_cooldown() {
    let mut book = SpellBook::new();
    let mut shield = ShieldEffect::default();
    assert!(book.unlock_spell(SpellId::ArrestoMomentum));
    book.equip_spell(SpellId::ArrestoMomentum, 2).expect("unlocked spell equips");
    assert!(book.select_spell(2));
    let mut mana = 20.0_f32;
    let start = Timestamp::from_millis(5_000);

    let cast = book
        .cast_current_spell(mana, start, &mut shield)
        .expect("first cast succeeds");
    assert_eq!(cast.id, SpellId::ArrestoMomentum);
    mana -= cast.mana_cost;
    assert_eq!(mana, 10.0);

    match book.cast_current_spell(mana, start, &mut shield) {
        Err(CastError::OnCooldown {
            spell,
            remaining_secs,
        }) => {
            assert_eq!(spell, SpellId::ArrestoMomentum);
            assert!((remaining_secs - 8.0).abs() < 1e-4);
        }
        other => panic!("expected a cooldown failure, got {other:?}"),
    }

    let ready_at = start.advanced_by(cast.cooldown);
    assert_eq!(ready_at, Timestamp::from_millis(13_000));
    assert!(book.cast_current_spell(mana, ready_at, &mut shield).is_ok());
}

#[test]
fn cooldowns_are_tracked_per_spell() {
    let mut book = SpellBook::new();
    let mut shield = ShieldEffect::default();
    assert!(book.unlock_spell(SpellId::Stupefix));
    book.equip_spell(SpellId::Stupefix, 2).expect("unlocked spell equips");

    assert!(book.select_spell(1));
    assert!(book.cast_current_spell(100.0, Timestamp::ZERO, &mut shield).is_ok());
    assert!(book.select_spell(2));
    assert!(book.cast_current_spell(100.0, Timestamp::ZERO, &mut shield).is_ok());

    let later = Timestamp::from_millis(3_000);
    assert_eq!(book.cooldown_remaining(SpellId::Expelliarmus, later), Duration::ZERO);
    assert_eq!(
        book.cooldown_remaining(SpellId::Stupefix, later),
        Duration::from_millis(4_000)
    );
}

#[test]
fn reset_restores_the_starter_book() {
    let mut book = SpellBook::new();
    let mut shield = ShieldEffect::default();
    let _ = book.unlock_all();
    book.equip_spell(SpellId::AvadaKedavra, 3).expect("unlocked spell equips");
    assert!(book.select_spell(1));
    assert!(book.cast_current_spell(100.0, Timestamp::ZERO, &mut shield).is_ok());

    book.reset();

    assert_eq!(book, SpellBook::new());
    assert_eq!(
        book.cooldown_remaining(SpellId::Expelliarmus, Timestamp::ZERO),
        Duration::ZERO
    );
}
