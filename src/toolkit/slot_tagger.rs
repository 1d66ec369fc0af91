use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;
use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::bail;
use log::debug;

use crate::errors::*;
use crate::models::{ProcessedIntent, SlotsModel};
use crate::toolkit::{SlotTagger, SlotTaggerFactory};
use crate::utils::{IntentName, SlotName};

const MAGIC: &[u8; 4] = b"SLTG";
const FORMAT_VERSION: u8 = 1;

/// Slot tagger remembering which slot each token of each intent was most
/// often annotated with.
///
/// Binary layout: the `SLTG` magic, a format version byte, the number of
/// entries as a little endian `u32`, then each entry as three length
/// prefixed UTF-8 strings (intent, token, slot).
#[derive(Debug, Default, PartialEq)]
pub struct DictionarySlotTagger {
    slots_by_intent: HashMap<IntentName, HashMap<String, SlotName>>,
}

impl DictionarySlotTagger {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(bytes);
        let mut magic = [0; 4];
        reader.read_exact(&mut magic).map_err(wrong_format)?;
        if &magic != MAGIC {
            bail!(NluError::WrongSlotTaggerFormat("missing magic bytes".to_string()));
        }
        let version = reader.read_u8().map_err(wrong_format)?;
        if version != FORMAT_VERSION {
            bail!(NluError::WrongSlotTaggerFormat(format!(
                "unsupported version {}",
                version
            )));
        }
        let nb_entries = reader.read_u32::<LittleEndian>().map_err(wrong_format)?;
        let mut slots_by_intent: HashMap<IntentName, HashMap<String, SlotName>> = HashMap::new();
        for _ in 0..nb_entries {
            let intent = read_string(&mut reader)?;
            let token = read_string(&mut reader)?;
            let slot = read_string(&mut reader)?;
            slots_by_intent
                .entry(intent)
                .or_insert_with(HashMap::new)
                .insert(token, slot);
        }
        if reader.position() != bytes.len() as u64 {
            bail!(NluError::WrongSlotTaggerFormat(
                "trailing bytes after last entry".to_string()
            ));
        }
        Ok(Self { slots_by_intent })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let entries: BTreeMap<(&IntentName, &String), &SlotName> = self
            .slots_by_intent
            .iter()
            .flat_map(|(intent, slots)| {
                slots
                    .iter()
                    .map(move |(token, slot)| ((intent, token), slot))
            })
            .collect();
        let mut writer = Vec::new();
        writer.write_all(MAGIC)?;
        writer.write_u8(FORMAT_VERSION)?;
        writer.write_u32::<LittleEndian>(to_u32(entries.len())?)?;
        for ((intent, token), slot) in entries {
            write_string(&mut writer, intent)?;
            write_string(&mut writer, token)?;
            write_string(&mut writer, slot)?;
        }
        Ok(writer)
    }

    pub fn fit(intents: &[ProcessedIntent]) -> Self {
        let mut slots_by_intent = HashMap::new();
        for intent in intents {
            // token -> (count without slot, count per slot)
            let mut counts: BTreeMap<&String, (usize, BTreeMap<&SlotName, usize>)> =
                BTreeMap::new();
            for token in intent.utterances.iter().flat_map(|u| u.tokens.iter()) {
                let entry = counts.entry(&token.value).or_insert((0, BTreeMap::new()));
                match token.slot.as_ref() {
                    Some(slot) => *entry.1.entry(slot).or_insert(0) += 1,
                    None => entry.0 += 1,
                }
            }
            let slots: HashMap<String, SlotName> = counts
                .into_iter()
                .filter_map(|(token, (nb_unslotted, slot_counts))| {
                    slot_counts
                        .into_iter()
                        .max_by(|lhs, rhs| lhs.1.cmp(&rhs.1).then_with(|| rhs.0.cmp(lhs.0)))
                        .filter(|(_, count)| *count > nb_unslotted)
                        .map(|(slot, _)| (token.clone(), slot.clone()))
                })
                .collect();
            if !slots.is_empty() {
                slots_by_intent.insert(intent.name.clone(), slots);
            }
        }
        Self { slots_by_intent }
    }
}

impl SlotTagger for DictionarySlotTagger {
    fn tag(&self, intent: &str, tokens: &[String]) -> Result<Vec<Option<SlotName>>> {
        let slots = self.slots_by_intent.get(intent);
        Ok(tokens
            .iter()
            .map(|token| slots.and_then(|slots| slots.get(token).cloned()))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DictionarySlotTaggerFactory;

impl SlotTaggerFactory for DictionarySlotTaggerFactory {
    fn train(&self, intents: &[ProcessedIntent]) -> Result<SlotsModel> {
        let tagger = DictionarySlotTagger::fit(intents);
        debug!(
            "Trained slot tagger for {} intents",
            tagger.slots_by_intent.len()
        );
        Ok(SlotsModel::from_bytes(tagger.to_bytes()?))
    }

    fn load(&self, model: &SlotsModel) -> Result<Box<dyn SlotTagger>> {
        Ok(Box::new(DictionarySlotTagger::from_bytes(model.as_bytes())?))
    }
}

fn wrong_format(error: io::Error) -> NluError {
    match error.kind() {
        io::ErrorKind::UnexpectedEof => {
            NluError::WrongSlotTaggerFormat("unexpected end of data".to_string())
        }
        _ => NluError::WrongSlotTaggerFormat(format!("{}", error)),
    }
}

fn read_string(reader: &mut Cursor<&[u8]>) -> Result<String> {
    let length = reader.read_u32::<LittleEndian>().map_err(wrong_format)? as u64;
    let remaining = reader.get_ref().len() as u64 - reader.position();
    if length > remaining {
        bail!(NluError::WrongSlotTaggerFormat(format!(
            "string of {} bytes exceeds the {} remaining ones",
            length, remaining
        )));
    }
    let mut buffer = vec![0; length as usize];
    reader.read_exact(&mut buffer).map_err(wrong_format)?;
    String::from_utf8(buffer).map_err(|e| NluError::WrongSlotTaggerFormat(format!("{}", e)).into())
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| NluError::InternalError(format!("{} does not fit in 32 bits", value)).into())
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    writer.write_u32::<LittleEndian>(to_u32(value.len())?)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProcessedUtterance, TaggedToken};
    use crate::testutils::tokens;

    fn tagged(value: &str, slot: Option<&str>) -> TaggedToken {
        TaggedToken {
            value: value.to_string(),
            slot: slot.map(|s| s.to_string()),
        }
    }

    fn book_flight_intent() -> ProcessedIntent {
        ProcessedIntent {
            name: "book_flight".to_string(),
            contexts: vec!["travel".to_string()],
            slot_definitions: vec![],
            utterances: vec![
                ProcessedUtterance {
                    text: "fly to paris".to_string(),
                    tokens: vec![
                        tagged("fly", None),
                        tagged("to", None),
                        tagged("paris", Some("destination")),
                    ],
                },
                ProcessedUtterance {
                    text: "to london".to_string(),
                    tokens: vec![tagged("to", None), tagged("london", Some("destination"))],
                },
            ],
        }
    }

    #[test]
    fn test_tagger_tags_known_tokens() {
        // Given
        let factory = DictionarySlotTaggerFactory;
        let model = factory.train(&[book_flight_intent()]).unwrap();

        // When
        let tagger = factory.load(&model).unwrap();
        let slots = tagger
            .tag("book_flight", &tokens(&["fly", "to", "london", "now"]))
            .unwrap();
        let other_intent_slots = tagger.tag("greet", &tokens(&["london"])).unwrap();

        // Then
        assert_eq!(vec![None, None, Some("destination".to_string()), None], slots);
        assert_eq!(vec![None], other_intent_slots);
    }

    #[test]
    fn test_binary_format_starts_with_header() {
        // Given
        let tagger = DictionarySlotTagger::fit(&[book_flight_intent()]);

        // When
        let bytes = tagger.to_bytes().unwrap();

        // Then
        assert_eq!(b"SLTG", &bytes[0..4]);
        assert_eq!(1, bytes[4]);
        assert_eq!(&[2, 0, 0, 0], &bytes[5..9]);
        assert_eq!(tagger, DictionarySlotTagger::from_bytes(&bytes).unwrap());
    }

    #[test]
    fn test_empty_model_is_rejected() {
        // When
        let loaded = DictionarySlotTaggerFactory.load(&SlotsModel::default());

        // Then
        let error = loaded.err().unwrap();
        assert!(format!("{}", error).starts_with("Wrong slot tagger format"));
    }

    #[test]
    fn test_truncated_model_is_rejected() {
        // Given
        let mut bytes = DictionarySlotTagger::fit(&[book_flight_intent()])
            .to_bytes()
            .unwrap();
        bytes.truncate(7);

        // When
        let loaded = DictionarySlotTagger::from_bytes(&bytes);

        // Then
        assert_eq!(
            "Wrong slot tagger format: unexpected end of data",
            format!("{}", loaded.err().unwrap())
        );
    }

    #[test]
    fn test_oversized_string_length_is_rejected() {
        // Given
        let mut bytes = b"SLTG".to_vec();
        bytes.push(1);
        bytes.extend_from_slice(&[1, 0, 0, 0]);
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0x7f]);
        bytes.extend_from_slice(b"greet");

        // When
        let loaded = DictionarySlotTagger::from_bytes(&bytes);

        // Then
        let error = format!("{}", loaded.err().unwrap());
        assert!(error.starts_with("Wrong slot tagger format"));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        // Given
        let mut bytes = DictionarySlotTagger::fit(&[book_flight_intent()])
            .to_bytes()
            .unwrap();
        bytes.push(0);

        // When
        let loaded = DictionarySlotTagger::from_bytes(&bytes);

        // Then
        assert!(format!("{}", loaded.err().unwrap()).contains("trailing bytes"));
    }
}
