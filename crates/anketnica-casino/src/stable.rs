//! The house stable every casino starts with.

use anketnica_types::{Horse, HorseId};

/// `(name, speed, stamina, luck, description)` of each house horse, in id
/// order.
const HOUSE_STABLE: [(&str, u8, u8, u8, &str); 13] = [
    ("Николай Гоголь", 7, 8, 6, "Мертвые души летят к финишу"),
    ("Джон Умасумэ", 9, 5, 8, "Модуль скорости превыше всего"),
    ("Альтаир Тасмухамбетов", 8, 7, 7, "Пропаганда Лососей"),
    ("Артём Выдра", 6, 9, 5, "Его лунная походка"),
    ("Владимир Путин", 8, 8, 9, "Крым наш, и победа тоже"),
    ("Илон Маск", 10, 4, 7, "К Марсу и обратно за 2 минуты"),
    ("Стив Джоб", 7, 6, 8, "Инновации в каждом шаге"),
    ("Глеб Фусигурович", 6, 7, 9, "На миду стой, а не ставки на коней делай"),
    ("Шрек", 5, 20, 6, "Медленно, но верно"),
    ("Чак Норрис", 9, 9, 10, "Не бежит - дистанция приходит к нему"),
    ("Дональд Трамп", 6, 5, 8, "Сделаем скачки снова великими"),
    ("Пикачу", 9, 6, 8, "Пика-пика"),
    ("Соник Ёжиков", 10, 5, 6, "Gotta go fast!"),
];

/// The house stable, ids 1 to 13.
pub fn house_stable() -> Vec<Horse> {
    (1_i64..)
        .zip(HOUSE_STABLE)
        .map(|(id, (name, speed, stamina, luck, description))| Horse {
            id: HorseId::new(id),
            name: name.to_owned(),
            base_speed: speed,
            base_stamina: stamina,
            base_luck: luck,
            description: description.to_owned(),
        })
        .collect()
}
