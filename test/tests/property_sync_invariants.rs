/// PROPERTY-BASED TESTS: synchronization invariants
///
/// Uses proptest to verify the sync guarantees hold across random inputs.
///
/// Key invariants:
/// 1. Writing the same value twice sends at most once
/// 2. Values and envelopes survive encode/decode
/// 3. Fields that never left their default stay out of snapshots
/// 4. Packets only reach the field they name
/// 5. A replica fed every packet ends up equal to the authority

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use synk_shared::{decode_value, encode_value, InstanceKey, Synk, SynkPacket};
use synk_test::{deliver, join, LocalHub, Phase, TestGame};

fn recording_authority() -> (Synk, Arc<Mutex<Vec<String>>>) {
    let synk = Synk::authority();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let sent_clone = sent.clone();
    synk.register_send_handler(move |_, data| {
        sent_clone.lock().unwrap().push(data.to_string());
        Ok(())
    })
    .unwrap();
    (synk, sent)
}

fn phase_strategy() -> impl Strategy<Value = Phase> {
    prop_oneof![
        Just(Phase::Lobby),
        any::<u8>().prop_map(|round| Phase::Playing { round }),
        Just(Phase::Finished),
    ]
}

#[derive(Clone, Debug)]
enum Write {
    Score(u32),
    Player(String),
    Phase(Phase),
    Winner(Option<String>),
}

fn write_strategy() -> impl Strategy<Value = Write> {
    prop_oneof![
        (0u32..5).prop_map(Write::Score),
        "[a-d]{1,3}".prop_map(Write::Player),
        phase_strategy().prop_map(Write::Phase),
        proptest::option::of("[a-z]{0,4}").prop_map(Write::Winner),
    ]
}

fn apply(game: &TestGame, write: &Write) {
    let result = match write {
        Write::Score(score) => game.score.set(*score).map(|_| ()),
        Write::Player(name) => game.add_player(name).map(|_| ()),
        Write::Phase(phase) => game.phase.set(*phase).map(|_| ()),
        Write::Winner(winner) => game.winner.set(winner.clone()).map(|_| ()),
    };
    result.unwrap();
}

proptest! {
    #[test]
    fn prop_double_write_sends_at_most_once(start in any::<i64>(), value in any::<i64>()) {
        let (synk, sent) = recording_authority();
        let field = synk.declare(InstanceKey::from_u64(1), "value", start);

        field.set(value).unwrap();
        field.set(value).unwrap();

        let expected = if start == value { 0 } else { 1 };
        prop_assert_eq!(sent.lock().unwrap().len(), expected);
    }

    #[test]
    fn prop_values_round_trip(text in ".*", number in any::<i32>(), list in prop::collection::vec(any::<u16>(), 0..8)) {
        prop_assert_eq!(decode_value::<String>(&encode_value("text", &text).unwrap()).unwrap(), text);
        prop_assert_eq!(decode_value::<i32>(&encode_value("number", &number).unwrap()).unwrap(), number);
        prop_assert_eq!(decode_value::<Vec<u16>>(&encode_value("list", &list).unwrap()).unwrap(), list);
    }

    #[test]
    fn prop_envelope_round_trips(var_name in ".*", data in ".*") {
        let packet = SynkPacket::new(var_name, data);
        let wire = packet.encode().unwrap();
        prop_assert_eq!(SynkPacket::try_decode(&wire), Some(packet));
    }

    #[test]
    fn prop_untouched_fields_stay_out_of_snapshots(touched in prop::collection::vec(any::<bool>(), 1..8)) {
        let (synk, _sent) = recording_authority();
        let key = InstanceKey::from_u64(1);
        let fields: Vec<_> = (0..touched.len())
            .map(|index| synk.declare(key, format!("field{}", index), 0u8))
            .collect();

        for (field, touch) in fields.iter().zip(&touched) {
            if *touch {
                field.set(1).unwrap();
            }
        }

        let names: Vec<String> = synk
            .snapshot_for_new_client(&key)
            .unwrap()
            .iter()
            .map(|wire| SynkPacket::try_decode(wire).unwrap().var_name().to_string())
            .collect();
        let expected: Vec<String> = touched
            .iter()
            .enumerate()
            .filter(|(_, touch)| **touch)
            .map(|(index, _)| format!("field{}", index))
            .collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn prop_packets_only_reach_their_field(target in 0usize..4, instance in 0u64..3, value in 1u32..1000) {
        let synk = Synk::replica();
        let games: Vec<TestGame> = (0..3)
            .map(|id| TestGame::new(&synk, InstanceKey::from_u64(id)))
            .collect();
        let names = ["score", "players", "phase", "winner"];
        let data = match names[target] {
            "score" => encode_value("score", &value).unwrap(),
            "players" => encode_value("players", &vec![value.to_string()]).unwrap(),
            "phase" => encode_value("phase", &Phase::Finished).unwrap(),
            _ => encode_value("winner", &Some(value.to_string())).unwrap(),
        };
        let wire = SynkPacket::new(names[target], data).encode().unwrap();

        prop_assert!(synk.handle_inbound_data(&InstanceKey::from_u64(instance), &wire).unwrap());

        for (id, game) in games.iter().enumerate() {
            let hit = id as u64 == instance;
            prop_assert_eq!(game.score.get() != 0, hit && target == 0);
            prop_assert_eq!(!game.players.get().is_empty(), hit && target == 1);
            prop_assert_eq!(game.phase.get() != Phase::Lobby, hit && target == 2);
            prop_assert_eq!(game.winner.get().is_some(), hit && target == 3);
        }
    }

    #[test]
    fn prop_replica_converges(
        before_join in prop::collection::vec(write_strategy(), 0..12),
        after_join in prop::collection::vec(write_strategy(), 0..12),
    ) {
        let authority = Synk::authority();
        let hub = LocalHub::new();
        authority.register_send_handler(hub.send_handler()).unwrap();
        let key = InstanceKey::from_u64(1);
        let game = TestGame::new(&authority, key);

        for write in &before_join {
            apply(&game, write);
        }

        let replica = Synk::replica();
        let replica_game = TestGame::new(&replica, key);
        let client = join(&hub, &authority, &key).unwrap();

        for write in &after_join {
            apply(&game, write);
        }

        let delivery = deliver(&hub, client, &replica, &key).unwrap();
        prop_assert!(delivery.foreign.is_empty());
        prop_assert!(game.mirrors(&replica_game));
    }
}

#[test]
fn foreign_strings_never_decode() {
    for data in ["not a packet", "null", "{}", "{\"varName\":1,\"data\":\"1\"}"] {
        assert_eq!(SynkPacket::try_decode(data), None);
    }
}
