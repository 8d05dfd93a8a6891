/// 声明配置结构并生成其可选形态与合成代码
///
/// ```
/// use strata::schema;
///
/// schema! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct WebSettings => WebSettingsPartial {
///         pub enabled: bool,
///         pub port: u16,
///     }
/// }
///
/// schema! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Settings => SettingsPartial {
///         pub log_level: String,
///         pub web: WebSettings,
///         pub description: Option<String>,
///     }
/// }
///
/// let partial = SettingsPartial {
///     web: Some(WebSettingsPartial { port: Some(8080), ..Default::default() }),
///     ..Default::default()
/// };
/// assert_eq!(partial.log_level, None);
/// ```
///
/// 目标结构需要实现 `Debug`、`Clone` 与 `Default`，调用方 crate 需依赖 `serde`。
/// 默认生成总是通过的 [`Verify`](crate::schema::Verify) 实现；在可选形态名后写
/// `: Verify` 时不生成，由调用方自行实现校验规则。
/// 字段类型必须实现 [`Overlay`](crate::schema::Overlay)；嵌套结构同样用本宏声明即可。
/// 可选形态的字段名与 Rust 字段名一致，原结构上的属性不会复制到可选形态上。
#[macro_export]
macro_rules! schema {
    (
        @define
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $partial:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_ty,
            )*
        }

        #[doc = concat!("`", stringify!($name), "` 的可选形态，未设置的字段为 `None`")]
        #[derive(Debug, Clone, Default, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(default)]
        $vis struct $partial {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                pub $field: ::std::option::Option<<$field_ty as $crate::schema::Overlay>::Slot>,
            )*
        }

        impl $crate::schema::Overlay for $name {
            type Slot = $partial;

            fn shape() -> $crate::schema::Shape {
                $crate::schema::Shape::Nested(<Self as $crate::schema::Schema>::descriptor())
            }

            fn overlay(
                &mut self,
                slot: &Self::Slot,
            ) -> ::std::result::Result<(), $crate::error::MergeError> {
                <Self as $crate::schema::Schema>::overlay_partial(self, slot)
            }

            fn to_slot(&self) -> ::std::option::Option<Self::Slot> {
                ::std::option::Option::Some(<Self as $crate::schema::Schema>::to_partial(self))
            }

            fn assign(
                slot: &mut ::std::option::Option<Self::Slot>,
                path: &[&str],
                raw: &str,
            ) -> ::std::result::Result<(), $crate::error::FieldError> {
                if path.is_empty() {
                    return ::std::result::Result::Err($crate::error::FieldError::new(
                        $crate::error::FieldErrorKind::NotLeaf,
                    ));
                }
                let mut partial = slot.clone().unwrap_or_default();
                <Self as $crate::schema::Schema>::assign_partial(&mut partial, path, raw)?;
                *slot = ::std::option::Option::Some(partial);
                ::std::result::Result::Ok(())
            }
        }

        impl $crate::schema::Schema for $name {
            type Partial = $partial;

            fn descriptor() -> $crate::schema::TypeDescriptor {
                $crate::schema::TypeDescriptor::new(
                    stringify!($name),
                    vec![
                        $(
                            $crate::schema::FieldDescriptor::new(
                                stringify!($field),
                                <$field_ty as $crate::schema::Overlay>::shape(),
                            ),
                        )*
                    ],
                )
            }

            #[allow(unused_variables)]
            fn overlay_partial(
                &mut self,
                partial: &$partial,
            ) -> ::std::result::Result<(), $crate::error::MergeError> {
                $(
                    if let ::std::option::Option::Some(slot) = &partial.$field {
                        <$field_ty as $crate::schema::Overlay>::overlay(&mut self.$field, slot)
                            .map_err(|e| e.within(stringify!($field)))?;
                    }
                )*
                ::std::result::Result::Ok(())
            }

            #[allow(unused_variables)]
            fn assign_partial(
                partial: &mut $partial,
                path: &[&str],
                raw: &str,
            ) -> ::std::result::Result<(), $crate::error::FieldError> {
                let (head, rest) = match path.split_first() {
                    ::std::option::Option::Some(split) => split,
                    ::std::option::Option::None => {
                        return ::std::result::Result::Err($crate::error::FieldError::new(
                            $crate::error::FieldErrorKind::NotLeaf,
                        ))
                    }
                };
                match *head {
                    $(
                        stringify!($field) => <$field_ty as $crate::schema::Overlay>::assign(
                            &mut partial.$field,
                            rest,
                            raw,
                        )
                        .map_err(|e| e.within(stringify!($field))),
                    )*
                    _ => ::std::result::Result::Err(
                        $crate::error::FieldError::new($crate::error::FieldErrorKind::Unknown)
                            .within(head),
                    ),
                }
            }

            fn to_partial(&self) -> $partial {
                $partial {
                    $(
                        $field: <$field_ty as $crate::schema::Overlay>::to_slot(&self.$field),
                    )*
                }
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $partial:ident : Verify {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $crate::schema! {
            @define
            $(#[$meta])*
            $vis struct $name => $partial {
                $(
                    $(#[$field_meta])*
                    $field_vis $field : $field_ty
                ),*
            }
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $partial:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $crate::schema! {
            @define
            $(#[$meta])*
            $vis struct $name => $partial {
                $(
                    $(#[$field_meta])*
                    $field_vis $field : $field_ty
                ),*
            }
        }

        impl $crate::schema::Verify for $name {}
    };
}
